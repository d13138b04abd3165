//! # Reporting Module / 报告模块
//!
//! Console rendering of the session's results.
//! 会话结果的控制台渲染。

pub mod console;

pub use console::{print_failure_details, print_summary};
