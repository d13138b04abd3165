//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the HIL runner,
//! including session logging, file system operations, and i18n support.
//!
//! 此模块为 HIL 运行器提供基础设施服务，
//! 包括会话日志、文件系统操作和国际化支持。

pub mod fs;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
