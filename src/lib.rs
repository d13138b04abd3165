//! # HIL Runner Library / HIL Runner 库
//!
//! This library provides the core functionality of the HIL runner, a
//! queue-driven hardware-in-the-loop test executor for embedded bench
//! automation: an ordered queue of heterogeneous tests, a shared registry of
//! bench hardware capabilities, a single sequential worker with per-test
//! timeouts and cooperative cancellation, and session-scoped logging with a
//! CSV result ledger.
//!
//! 此库提供 HIL 运行器的核心功能，这是一个面向嵌入式台架自动化的、
//! 队列驱动的硬件在环测试执行器：有序的异构测试队列、共享的台架硬件
//! 能力注册表、带单测试超时和协作式取消的单个顺序工作者，
//! 以及带 CSV 结果台账的会话范围日志。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, configuration, queue, execution engine and controller
//! - `hardware` - Capability traits, registry, terminal pumps and simulated bench
//! - `infra` - Session logging, file system operations and i18n
//! - `reporting` - Console rendering of results
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、配置、队列、执行引擎和控制器
//! - `hardware` - 能力特质、注册表、终端泵和模拟台架
//! - `infra` - 会话日志、文件系统操作和国际化
//! - `reporting` - 结果的控制台渲染
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod hardware;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::controller;
pub use core::execution;
pub use core::models;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    // Detect system locale and set it for i18n.
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    // Try to match the full locale first (e.g., "zh-CN")
    // Then try to match the language part only (e.g., "en" from "en-US")
    // Finally, fall back to "en"
    let lang = if available_locales.contains(&locale.as_str()) {
        &locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
