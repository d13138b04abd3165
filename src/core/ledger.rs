//! # Result Ledger Module / 结果台账模块
//!
//! The session's ordered, append-only sequence of run records. Records are
//! never mutated or removed; the summary is a pure fold over the current
//! sequence and can be taken any number of times with the same result.
//!
//! 会话的有序、仅追加的运行记录序列。记录从不被修改或删除；
//! 摘要是对当前序列的纯折叠，可任意多次获取且结果一致。

use crate::core::models::{RunRecord, RunSummary, TestStatus};

/// Append-only record store, owned by the run controller.
/// 仅追加的记录存储，由运行控制器拥有。
#[derive(Debug, Default)]
pub struct ResultLedger {
    records: Vec<RunRecord>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one finished record. Execution order is ledger order.
    pub fn append(&mut self, record: RunRecord) {
        self.records.push(record);
    }

    /// Every record so far, in execution order.
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Aggregates the ledger. `wall_clock` is the sum of per-test durations,
    /// not the session's elapsed time.
    /// 聚合台账。`wall_clock` 是各测试时长之和，而非会话经过的时间。
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.records.len(),
            ..RunSummary::default()
        };
        for record in &self.records {
            match record.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Error => summary.errors += 1,
                TestStatus::Cancelled => summary.cancelled += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
            summary.wall_clock += record.duration;
        }
        summary
    }
}
