//! # Console Reporting Module / 控制台报告模块
//!
//! This module renders the session's result ledger on the console: a colored
//! per-test table, aggregate counts, and detailed output for failures.
//!
//! 此模块在控制台上渲染会话的结果台账：彩色的逐测试表格、
//! 聚合计数以及失败的详细输出。

use colored::*;

use crate::core::models::{RunRecord, RunSummary, TestStatus};
use crate::infra::t;

/// Prints the per-test summary table followed by the aggregate counts line.
/// Status colors: PASSED green, FAILED/ERROR red, CANCELLED yellow, SKIPPED
/// dimmed.
///
/// 打印逐测试摘要表格及其后的聚合计数行。状态颜色：PASSED 绿色，
/// FAILED/ERROR 红色，CANCELLED 黄色，SKIPPED 暗色。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   - PASSED     | boot voltage check                       |     1.234s
///   - FAILED     | flash smoke test                         |     0.456s  voltage out of range
/// ```
pub fn print_summary(records: &[RunRecord], summary: &RunSummary, locale: &str) {
    println!("\n{}", t!("summary_banner", locale = locale).bold());

    for record in records {
        let status_str = record.status.to_string();
        let status_colored = match record.status {
            TestStatus::Passed => status_str.green(),
            TestStatus::Failed | TestStatus::Error => status_str.red(),
            TestStatus::Cancelled => status_str.yellow(),
            TestStatus::Skipped => status_str.dimmed(),
        };
        let duration_str = if record.status == TestStatus::Skipped {
            "N/A".to_string()
        } else {
            format!("{:.3}s", record.duration.as_secs_f64())
        };

        println!(
            "  - {:<10} | {:<40} | {:>10}  {}",
            status_colored, record.name, duration_str, record.message
        );
    }

    println!(
        "{}",
        t!(
            "summary_counts",
            locale = locale,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            errors = summary.errors,
            cancelled = summary.cancelled,
            skipped = summary.skipped,
            duration = format!("{:.3}s", summary.wall_clock.as_secs_f64())
        )
    );
}

/// Prints the full message of every FAILED or ERROR record, one block per
/// failure. Returns early when there is nothing to show.
///
/// 打印每条 FAILED 或 ERROR 记录的完整消息，每个失败一个块。
/// 没有可显示内容时提前返回。
pub fn print_failure_details(records: &[RunRecord], locale: &str) {
    let failures: Vec<&RunRecord> = records.iter().filter(|r| r.status.is_bad()).collect();
    if failures.is_empty() {
        return;
    }

    println!(
        "\n{}",
        t!("failure_details_banner", locale = locale).red().bold()
    );
    println!("{}", "-".repeat(80));

    for (i, record) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}' ({})",
            i + 1,
            failures.len(),
            record.status.to_string().red(),
            record.name.cyan(),
            record.id
        );
        println!("{}\n{}", record.message, "-".repeat(80));
    }
}
