//! # Bench Configuration Module / 台架配置模块
//!
//! Loads and validates the `Bench.toml` configuration: which devices the
//! session should connect, and the ordered list of tests to enqueue.
//!
//! 加载并校验 `Bench.toml` 配置：会话应连接哪些设备，
//! 以及要入队的有序测试列表。

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::models::{DeviceClass, ParamValue, TestKind, TestSpec};

/// Per-test default when the entry does not set `timeout_secs`.
/// 测试条目未设置 `timeout_secs` 时的默认值。
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// The whole bench configuration file.
/// 整个台架配置文件。
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BenchConfig {
    /// Console language, e.g. "en" or "zh-CN" / 控制台语言
    pub language: Option<String>,
    #[serde(default)]
    pub devices: DevicesConfig,
    #[serde(default, rename = "tests")]
    pub tests: Vec<TestEntry>,
}

/// Device endpoints. Every section is optional: a bench without a camera is
/// still a valid bench, and tests that need one will fail individually.
///
/// 设备端点。每一节都是可选的：没有摄像头的台架仍然是有效台架，
/// 需要摄像头的测试会单独失败。
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DevicesConfig {
    pub power: Option<PowerConfig>,
    pub tracer: Option<TracerConfig>,
    #[serde(default)]
    pub terminals: Vec<TerminalConfig>,
    pub camera: Option<CameraConfig>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PowerConfig {
    pub port: String,
    #[serde(default = "default_power_baud")]
    pub baud: u32,
}

fn default_power_baud() -> u32 {
    9600
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracerConfig {
    #[serde(default = "default_tracer_host")]
    pub host: String,
    #[serde(default = "default_tracer_port")]
    pub port: u16,
}

fn default_tracer_host() -> String {
    "localhost".to_string()
}

fn default_tracer_port() -> u16 {
    20000
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalConfig {
    /// Channel name used for the per-channel session log file.
    /// 用于每通道会话日志文件的通道名称。
    pub name: String,
    pub port: String,
    #[serde(default = "default_terminal_baud")]
    pub baud: u32,
}

fn default_terminal_baud() -> u32 {
    115_200
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Path of the already-prepared simulator configuration.
    /// 已准备好的仿真器配置文件路径。
    pub config: String,
}

/// One `[[tests]]` entry. Maps 1:1 to a queued descriptor.
/// 一个 `[[tests]]` 条目。与一个入队描述符一一对应。
#[derive(Debug, Clone, Deserialize)]
pub struct TestEntry {
    pub name: String,
    pub kind: TestKind,
    /// Script path (`macro_script`), or logical name (`function`, `bus_module`).
    /// 脚本路径（`macro_script`），或逻辑名称（`function`、`bus_module`）。
    pub reference: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retries: u8,
    /// Device class to abort-and-reset if this test times out.
    /// 此测试超时后需要中止复位的设备类别。
    pub device: Option<DeviceClass>,
}

impl TestEntry {
    /// Lowers a config entry into the engine's `TestSpec`, expanding `~` and
    /// environment variables in script-path references.
    fn to_spec(&self) -> Result<TestSpec> {
        let reference = match self.kind {
            TestKind::MacroScript => shellexpand::full(&self.reference)
                .with_context(|| format!("Failed to expand script path: {}", self.reference))?
                .into_owned(),
            TestKind::Function | TestKind::BusModule => self.reference.clone(),
        };
        // Macro-script tests always use the tracer; bus-module tests always
        // use the simulator. An explicit `device` key only matters for
        // function tests.
        let device = match self.kind {
            TestKind::MacroScript => Some(DeviceClass::Tracer),
            TestKind::BusModule => Some(DeviceClass::Bus),
            TestKind::Function => self.device,
        };
        Ok(TestSpec {
            name: self.name.clone(),
            kind: self.kind,
            reference,
            params: self.params.clone(),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retries: self.retries,
            device,
        })
    }
}

impl BenchConfig {
    /// Lowers every `[[tests]]` entry into a `TestSpec`, in file order.
    /// 按文件顺序将每个 `[[tests]]` 条目转换为 `TestSpec`。
    pub fn test_specs(&self) -> Result<Vec<TestSpec>> {
        self.tests.iter().map(TestEntry::to_spec).collect()
    }
}

/// Reads and parses a bench configuration file.
/// 读取并解析台架配置文件。
pub fn load_bench_config(path: &Path) -> Result<BenchConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read bench config: {}", path.display()))?;
    let config: BenchConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse bench config: {}", path.display()))?;
    Ok(config)
}
