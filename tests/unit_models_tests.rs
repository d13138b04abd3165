//! # Models Module Unit Tests / Models 模块单元测试
//!
//! This module contains unit tests for the `models.rs` data structures, the
//! error taxonomy, and the result ledger built on top of them.
//!
//! 此模块包含 `models.rs` 数据结构、错误分类以及基于它们构建的
//! 结果台账的单元测试。

use chrono::Local;
use std::collections::BTreeMap;
use std::time::Duration;

use hil_runner::core::ledger::ResultLedger;
use hil_runner::core::models::{
    DescriptorId, DeviceClass, EngineError, ParamValue, ParamsExt, RunRecord, TestParams,
    TestStatus,
};

/// Helper to build a record with a given status / 构建给定状态记录的辅助函数
fn record(id: u64, status: TestStatus, secs: u64) -> RunRecord {
    let now = Local::now();
    RunRecord {
        id: DescriptorId(id),
        name: format!("test-{id}"),
        status,
        started_at: now,
        finished_at: now,
        duration: Duration::from_secs(secs),
        message: String::new(),
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_status_display_is_uppercase() {
        assert_eq!(TestStatus::Passed.to_string(), "PASSED");
        assert_eq!(TestStatus::Failed.to_string(), "FAILED");
        assert_eq!(TestStatus::Error.to_string(), "ERROR");
        assert_eq!(TestStatus::Cancelled.to_string(), "CANCELLED");
        assert_eq!(TestStatus::Skipped.to_string(), "SKIPPED");
    }

    #[test]
    fn test_only_failed_and_error_are_bad() {
        assert!(TestStatus::Failed.is_bad());
        assert!(TestStatus::Error.is_bad());
        assert!(!TestStatus::Passed.is_bad());
        assert!(!TestStatus::Cancelled.is_bad());
        assert!(!TestStatus::Skipped.is_bad());
    }

    #[test]
    fn test_descriptor_id_display() {
        assert_eq!(DescriptorId(7).to_string(), "#7");
    }

    #[test]
    fn test_device_class_display() {
        assert_eq!(DeviceClass::Power.to_string(), "power");
        assert_eq!(DeviceClass::Bus.to_string(), "bus");
    }
}

#[cfg(test)]
mod params_tests {
    use super::*;

    fn sample_params() -> TestParams {
        let mut params = BTreeMap::new();
        params.insert("volts".to_string(), ParamValue::Float(12.5));
        params.insert("cycles".to_string(), ParamValue::Int(3));
        params.insert("label".to_string(), ParamValue::Str("boot".to_string()));
        params.insert("strict".to_string(), ParamValue::Bool(true));
        params
    }

    #[test]
    fn test_typed_accessors() {
        let params = sample_params();
        assert_eq!(params.get_f64("volts"), Some(12.5));
        assert_eq!(params.get_i64("cycles"), Some(3));
        assert_eq!(params.get_str("label"), Some("boot"));
        assert_eq!(params.get_bool("strict"), Some(true));
    }

    #[test]
    fn test_f64_accessor_coerces_from_int() {
        // TOML authors write `cycles = 3`, not `3.0`.
        let params = sample_params();
        assert_eq!(params.get_f64("cycles"), Some(3.0));
    }

    #[test]
    fn test_missing_and_mismatched_keys_return_none() {
        let params = sample_params();
        assert_eq!(params.get_f64("missing"), None);
        assert_eq!(params.get_str("volts"), None);
        assert_eq!(params.get_bool("label"), None);
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_the_limit() {
        let err = EngineError::Timeout {
            limit: Duration::from_secs(45),
        };
        assert_eq!(
            err.to_string(),
            "test exceeded its configured timeout of 45s"
        );
    }

    #[test]
    fn test_device_unavailable_names_the_class() {
        let err = EngineError::DeviceUnavailable {
            class: DeviceClass::Tracer,
        };
        assert_eq!(err.to_string(), "device 'tracer' is not available");
    }

    #[test]
    fn test_queue_state_carries_the_operation() {
        let err = EngineError::QueueState("'add' called while a run is active".to_string());
        assert!(err.to_string().contains("'add'"));
    }
}

#[cfg(test)]
mod ledger_tests {
    use super::*;

    #[test]
    fn test_summary_counts_every_status() {
        let mut ledger = ResultLedger::new();
        ledger.append(record(0, TestStatus::Passed, 2));
        ledger.append(record(1, TestStatus::Passed, 1));
        ledger.append(record(2, TestStatus::Failed, 3));
        ledger.append(record(3, TestStatus::Error, 1));
        ledger.append(record(4, TestStatus::Cancelled, 0));
        ledger.append(record(5, TestStatus::Skipped, 0));

        let summary = ledger.summary();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.wall_clock, Duration::from_secs(7));
    }

    #[test]
    fn test_summary_is_idempotent() {
        let mut ledger = ResultLedger::new();
        ledger.append(record(0, TestStatus::Passed, 1));
        ledger.append(record(1, TestStatus::Failed, 2));

        let first = ledger.summary();
        let second = ledger.summary();
        assert_eq!(first, second);
        assert_eq!(ledger.records().len(), 2);
    }

    #[test]
    fn test_records_keep_execution_order() {
        let mut ledger = ResultLedger::new();
        for i in 0..4 {
            ledger.append(record(i, TestStatus::Passed, 0));
        }
        let ids: Vec<u64> = ledger.records().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_ledger_summary_is_zero() {
        let ledger = ResultLedger::new();
        assert!(ledger.is_empty());
        let summary = ledger.summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.wall_clock, Duration::ZERO);
    }
}
