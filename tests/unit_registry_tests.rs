//! # Capability Registry Unit Tests / 能力注册表单元测试
//!
//! This module contains unit tests for `hardware/registry.rs`: connect-time
//! unavailability, lazy accessor errors, terminal lookup by channel name,
//! and the best-effort reset path.
//!
//! 此模块包含 `hardware/registry.rs` 的单元测试：连接期不可用、
//! 惰性访问器错误、按通道名查找终端，以及尽力而为的复位路径。

use std::sync::Arc;

use hil_runner::core::models::{DeviceClass, EngineError};
use hil_runner::hardware::registry::{CapabilityRegistry, RegistryBuilder};
use hil_runner::hardware::sim::{SimPowerSupply, SimTerminal, SimTracer};

#[test]
fn test_connected_devices_are_available_through_accessors() {
    let registry = RegistryBuilder::new()
        .power(Arc::new(SimPowerSupply::new()))
        .tracer(Arc::new(SimTracer::new()))
        .connect_all();

    assert!(registry.available(DeviceClass::Power));
    assert!(registry.available(DeviceClass::Tracer));
    assert!(!registry.available(DeviceClass::Camera));
    assert!(registry.unavailable().is_empty());

    assert!(registry.power().is_ok());
    assert!(registry.tracer().is_ok());
}

#[test]
fn test_failed_connect_is_recorded_but_does_not_block_the_rest() {
    let registry = RegistryBuilder::new()
        .power(Arc::new(SimPowerSupply::new()))
        .tracer(Arc::new(SimTracer::new().fail_connect()))
        .connect_all();

    // The tracer is demoted with its connect error retained.
    let reason = registry
        .unavailable()
        .get(&DeviceClass::Tracer)
        .expect("tracer should be recorded as unavailable");
    assert!(reason.contains("simulated connect failure"));
    assert!(!registry.available(DeviceClass::Tracer));
    assert!(matches!(
        registry.tracer().unwrap_err(),
        EngineError::DeviceUnavailable {
            class: DeviceClass::Tracer
        }
    ));

    // The power supply is untouched by the tracer's failure.
    assert!(registry.available(DeviceClass::Power));
    assert!(registry.power().is_ok());
}

#[test]
fn test_terminals_are_looked_up_by_channel_name() {
    let uart1 = Arc::new(SimTerminal::new("uart1"));
    let registry = RegistryBuilder::new()
        .terminal(Arc::new(SimTerminal::new("uart0")))
        .terminal(Arc::clone(&uart1))
        .connect_all();

    assert!(registry.available(DeviceClass::Terminal));
    assert_eq!(registry.terminals().len(), 2);
    let handle = registry.terminal("uart1").unwrap();
    assert_eq!(handle.name(), "uart1");
    handle.send_line("reboot").unwrap();
    assert_eq!(uart1.sent_lines(), vec!["reboot".to_string()]);
    assert!(matches!(
        registry.terminal("uart9").unwrap_err(),
        EngineError::DeviceUnavailable {
            class: DeviceClass::Terminal
        }
    ));
}

#[test]
fn test_empty_registry_has_nothing_available() {
    let registry = CapabilityRegistry::empty();
    for class in [
        DeviceClass::Power,
        DeviceClass::Tracer,
        DeviceClass::Terminal,
        DeviceClass::Camera,
        DeviceClass::Bus,
    ] {
        assert!(!registry.available(class));
    }
    // Nothing was configured, so nothing is reported as broken either.
    assert!(registry.unavailable().is_empty());
}

#[test]
fn test_abort_and_reset_targets_one_class() {
    let power = Arc::new(SimPowerSupply::new());
    let registry = RegistryBuilder::new().power(Arc::clone(&power)).connect_all();

    registry.abort_and_reset(DeviceClass::Power).unwrap();
    assert_eq!(power.reset_count(), 1);

    // A class with no connected handle fails instead of silently succeeding.
    assert!(registry.abort_and_reset(DeviceClass::Bus).is_err());
}
