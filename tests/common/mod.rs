// Shared test helpers for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

use hil_runner::core::models::{DeviceClass, TestKind, TestSpec};

/// A spec with sane defaults for queue and execution tests.
pub fn spec(name: &str, kind: TestKind, reference: &str) -> TestSpec {
    TestSpec {
        name: name.to_string(),
        kind,
        reference: reference.to_string(),
        params: BTreeMap::new(),
        timeout: Duration::from_secs(30),
        retries: 0,
        device: None,
    }
}

pub fn function_spec(name: &str, reference: &str) -> TestSpec {
    spec(name, TestKind::Function, reference)
}

pub fn macro_spec(name: &str, script: &str) -> TestSpec {
    let mut s = spec(name, TestKind::MacroScript, script);
    s.device = Some(DeviceClass::Tracer);
    s
}

pub fn bus_spec(name: &str, module: &str) -> TestSpec {
    let mut s = spec(name, TestKind::BusModule, module);
    s.device = Some(DeviceClass::Bus);
    s
}

/// A temp directory for session artifacts; kept alive by the caller.
pub fn log_base() -> TempDir {
    tempdir().expect("failed to create temporary directory")
}

/// Writes a bench configuration into `dir` and returns its path.
pub fn write_bench_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("Bench.toml");
    fs::write(&path, content).expect("failed to write bench config");
    path
}

/// A complete, valid bench configuration exercising every section.
pub fn full_bench_toml() -> &'static str {
    r#"
language = "en"

[devices.power]
port = "/dev/ttyUSB0"

[devices.tracer]
host = "127.0.0.1"
port = 20001

[[devices.terminals]]
name = "uart0"
port = "/dev/ttyUSB1"

[[devices.terminals]]
name = "uart1"
port = "/dev/ttyUSB2"
baud = 9600

[devices.camera]
index = 0

[devices.bus]
config = "configs/bench.cfg"

[[tests]]
name = "boot voltage"
kind = "function"
reference = "boot_voltage_check"
device = "power"
timeout_secs = 20
[tests.params]
target_volts = 12
tolerance = 0.5

[[tests]]
name = "flash bootloader"
kind = "macro_script"
reference = "scripts/flash.cmm"
retries = 1

[[tests]]
name = "bus smoke"
kind = "bus_module"
reference = "smoke"
"#
}
