//! # Config Module Unit Tests / Config 模块单元测试
//!
//! This module contains unit tests for `config.rs`: parsing the bench
//! configuration, defaulting, and lowering entries into engine specs.
//!
//! 此模块包含 `config.rs` 的单元测试：解析台架配置、
//! 默认值处理，以及将条目转换为引擎规格。

mod common;

use std::time::Duration;

use hil_runner::core::config::{load_bench_config, BenchConfig, DEFAULT_TIMEOUT_SECS};
use hil_runner::core::models::{DeviceClass, ParamValue, TestKind};

fn parse(content: &str) -> BenchConfig {
    toml::from_str(content).expect("config should parse")
}

#[test]
fn test_full_config_parses() {
    let config = parse(common::full_bench_toml());

    assert_eq!(config.language.as_deref(), Some("en"));
    assert_eq!(config.devices.terminals.len(), 2);
    assert_eq!(config.devices.tracer.as_ref().unwrap().port, 20001);
    assert_eq!(
        config.devices.bus.as_ref().unwrap().config,
        "configs/bench.cfg"
    );
    assert_eq!(config.tests.len(), 3);
}

#[test]
fn test_device_defaults() {
    let config = parse(
        r#"
[devices.power]
port = "/dev/ttyUSB0"

[devices.tracer]

[[devices.terminals]]
name = "uart0"
port = "/dev/ttyUSB1"
"#,
    );

    assert_eq!(config.devices.power.as_ref().unwrap().baud, 9600);
    let tracer = config.devices.tracer.as_ref().unwrap();
    assert_eq!(tracer.host, "localhost");
    assert_eq!(tracer.port, 20000);
    assert_eq!(config.devices.terminals[0].baud, 115_200);
}

#[test]
fn test_empty_config_is_valid() {
    let config = parse("");
    assert!(config.language.is_none());
    assert!(config.tests.is_empty());
    assert!(config.devices.power.is_none());
    assert!(config.test_specs().unwrap().is_empty());
}

#[test]
fn test_entry_lowering_applies_defaults() {
    let config = parse(
        r#"
[[tests]]
name = "check"
kind = "function"
reference = "boot_voltage_check"
"#,
    );
    let specs = config.test_specs().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert_eq!(specs[0].retries, 0);
    assert_eq!(specs[0].device, None);
}

#[test]
fn test_kind_forces_the_device_class() {
    let config = parse(
        r#"
[[tests]]
name = "flash"
kind = "macro_script"
reference = "scripts/flash.cmm"
device = "power"

[[tests]]
name = "smoke"
kind = "bus_module"
reference = "smoke"

[[tests]]
name = "volts"
kind = "function"
reference = "boot_voltage_check"
device = "power"
"#,
    );
    let specs = config.test_specs().unwrap();
    // An explicit device key on a macro test is overridden: macros always
    // run on the tracer.
    assert_eq!(specs[0].device, Some(DeviceClass::Tracer));
    assert_eq!(specs[1].device, Some(DeviceClass::Bus));
    assert_eq!(specs[2].device, Some(DeviceClass::Power));
}

#[test]
fn test_params_accept_mixed_scalars() {
    let config = parse(
        r#"
[[tests]]
name = "check"
kind = "function"
reference = "boot_voltage_check"
[tests.params]
target_volts = 12.5
cycles = 3
label = "boot"
strict = true
"#,
    );
    let spec = &config.test_specs().unwrap()[0];
    assert_eq!(spec.params["target_volts"], ParamValue::Float(12.5));
    assert_eq!(spec.params["cycles"], ParamValue::Int(3));
    assert_eq!(spec.params["label"], ParamValue::Str("boot".to_string()));
    assert_eq!(spec.params["strict"], ParamValue::Bool(true));
}

#[test]
fn test_unknown_kind_is_rejected() {
    let result: Result<BenchConfig, _> = toml::from_str(
        r#"
[[tests]]
name = "bad"
kind = "shell_script"
reference = "x.sh"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_plain_script_path_passes_through() {
    let config = parse(
        r#"
[[tests]]
name = "flash"
kind = "macro_script"
reference = "scripts/flash.cmm"
"#,
    );
    let specs = config.test_specs().unwrap();
    assert_eq!(specs[0].kind, TestKind::MacroScript);
    assert_eq!(specs[0].reference, "scripts/flash.cmm");
}

#[test]
fn test_load_bench_config_reports_missing_file() {
    let dir = common::log_base();
    let err = load_bench_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read bench config"));
}

#[test]
fn test_load_bench_config_reads_from_disk() {
    let dir = common::log_base();
    let path = common::write_bench_config(&dir, common::full_bench_toml());
    let config = load_bench_config(&path).unwrap();
    assert_eq!(config.tests.len(), 3);
}
