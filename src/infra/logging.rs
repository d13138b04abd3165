//! # Session Logging Module / 会话日志模块
//!
//! Every session gets its own timestamped directory holding `main.log`, the
//! `results.csv` ledger mirror, one `term_<channel>.log` per serial terminal
//! and a `camera/` evidence subdirectory. Each file is owned by exactly one
//! writer task fed through an unbounded channel, so producers on any task can
//! emit lines without sharing a file handle; every line is flushed on write
//! so a crash loses at most the line in flight.
//!
//! 每个会话都有自己的时间戳目录，包含 `main.log`、`results.csv`
//! 台账镜像、每个串口终端一个的 `term_<channel>.log` 以及 `camera/`
//! 取证子目录。每个文件恰好由一个写入任务拥有，通过无界通道喂入，
//! 因此任意任务上的生产者都可以发送日志行而无需共享文件句柄；
//! 每行写入后立即刷新，崩溃时最多丢失在途的一行。

use anyhow::{Context, Result};
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::models::RunRecord;
use crate::infra::fs::{create_session_dir, sanitize_label};

const CSV_HEADER: &str = "id,name,status,duration,message";

/// Cloneable producer half of one log file. Emitting never blocks and never
/// fails from the producer's point of view; a dead writer drops the line.
///
/// 一个日志文件的可克隆生产者端。从生产者角度看，发送从不阻塞也从不
/// 失败；写入端已终止时该行被丢弃。
#[derive(Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<String>,
}

impl LogSink {
    pub fn emit(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }
}

/// Opens `path` and spawns the writer task that owns it. The task exits when
/// every `LogSink` clone has been dropped.
fn spawn_writer(path: PathBuf) -> Result<(LogSink, JoinHandle<()>)> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file '{}'", path.display()))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let handle = tokio::spawn(async move {
        let mut broken = false;
        while let Some(line) = rx.recv().await {
            if broken {
                continue;
            }
            if writeln!(file, "{line}").and_then(|()| file.flush()).is_err() {
                // Report once, then drain silently; logging must never take
                // the session down.
                eprintln!("log writer for '{}' stopped: write failed", path.display());
                broken = true;
            }
        }
    });
    Ok((LogSink { tx }, handle))
}

/// Quotes a CSV field when it contains a delimiter, quote or newline.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// All sinks of one session. Dropping the logger (via [`SessionLogger::close`])
/// ends the writer tasks; any `LogSink` clones handed out to pumps must be
/// dropped first or `close` will wait on them.
///
/// 一个会话的全部日志汇。通过 [`SessionLogger::close`] 丢弃记录器会结束
/// 写入任务；之前分发给泵任务的 `LogSink` 克隆必须先被丢弃，
/// 否则 `close` 会等待它们。
pub struct SessionLogger {
    session_dir: PathBuf,
    evidence_dir: PathBuf,
    main: LogSink,
    csv: LogSink,
    writers: Vec<JoinHandle<()>>,
}

impl SessionLogger {
    /// Creates the session directory under `base` and opens the main and CSV
    /// sinks. The CSV header is written immediately so a session that runs
    /// zero tests still leaves a well-formed ledger file.
    ///
    /// 在 `base` 下创建会话目录并打开主日志与 CSV 汇。CSV 表头立即写入，
    /// 因此即使会话没有运行任何测试也会留下格式完好的台账文件。
    pub fn open(base: &Path) -> Result<Self> {
        let session_dir = create_session_dir(base)?;
        let evidence_dir = session_dir.join("camera");
        std::fs::create_dir(&evidence_dir).with_context(|| {
            format!(
                "failed to create evidence directory '{}'",
                evidence_dir.display()
            )
        })?;

        let mut writers = Vec::new();
        let (main, handle) = spawn_writer(session_dir.join("main.log"))?;
        writers.push(handle);
        let (csv, handle) = spawn_writer(session_dir.join("results.csv"))?;
        writers.push(handle);
        csv.emit(CSV_HEADER);

        Ok(Self {
            session_dir,
            evidence_dir,
            main,
            csv,
            writers,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Where camera snapshots for this session land.
    pub fn evidence_dir(&self) -> &Path {
        &self.evidence_dir
    }

    /// Opens a per-terminal log file and returns its sink. The channel name is
    /// sanitized into the file name `term_<channel>.log`.
    pub fn terminal_sink(&mut self, channel: &str) -> Result<LogSink> {
        let file = format!("term_{}.log", sanitize_label(channel));
        let (sink, handle) = spawn_writer(self.session_dir.join(file))?;
        self.writers.push(handle);
        Ok(sink)
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.main
            .emit(format!("[{}] INFO  {}", timestamp(), message.as_ref()));
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.main
            .emit(format!("[{}] WARN  {}", timestamp(), message.as_ref()));
    }

    /// Mirrors one finished record into `results.csv`. Duration is seconds
    /// with millisecond precision.
    pub fn log_record(&self, record: &RunRecord) {
        self.csv.emit(format!(
            "{},{},{},{:.3},{}",
            record.id.0,
            csv_escape(&record.name),
            record.status,
            record.duration.as_secs_f64(),
            csv_escape(&record.message),
        ));
    }

    /// Drops every owned sink and waits for the writer tasks to drain. Sinks
    /// handed out via [`SessionLogger::terminal_sink`] must already be gone.
    pub async fn close(self) {
        drop(self.main);
        drop(self.csv);
        for handle in self.writers {
            let _ = handle.await;
        }
    }
}
