//! # Filesystem Helpers Module / 文件系统辅助模块
//!
//! Session-directory creation and name sanitizing for log and evidence files.
//! 会话目录创建，以及日志与取证文件的名称净化。

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

/// Creates a fresh timestamped session directory under `base`, named
/// `YYYYmmdd_HHMMSS`. Two sessions started within the same second get a
/// numeric suffix instead of sharing a directory.
///
/// 在 `base` 下创建一个新的时间戳会话目录，命名为 `YYYYmmdd_HHMMSS`。
/// 同一秒内启动的两个会话会获得数字后缀，而不是共享目录。
pub fn create_session_dir(base: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    std::fs::create_dir_all(base)
        .with_context(|| format!("failed to create log base directory '{}'", base.display()))?;

    let mut candidate = base.join(&stamp);
    let mut suffix = 1;
    while candidate.exists() {
        candidate = base.join(format!("{stamp}_{suffix}"));
        suffix += 1;
    }
    std::fs::create_dir(&candidate).with_context(|| {
        format!(
            "failed to create session directory '{}'",
            candidate.display()
        )
    })?;
    Ok(candidate)
}

/// Reduces a free-text label to a safe file-name fragment.
pub fn sanitize_label(label: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}
