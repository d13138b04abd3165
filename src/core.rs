//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the HIL runner,
//! including data models, configuration, the test queue, the execution
//! engine and the run controller.
//!
//! 此模块包含 HIL 运行器的核心功能，
//! 包括数据模型、配置、测试队列、执行引擎和运行控制器。

pub mod config;
pub mod controller;
pub mod execution;
pub mod ledger;
pub mod models;
pub mod queue;

// Re-exports
pub use controller::RunController;
pub use models::{EngineError, EngineEvent, RunRecord, TestStatus};
pub use queue::TestQueue;
