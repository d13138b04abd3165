//! # Simulated Bench Module / 模拟台架模块
//!
//! In-process implementations of every capability trait, used by the test
//! suite, the criterion benchmark, and the CLI's `--simulated` mode. Each
//! device's behavior is scriptable: connect failures, latencies, canned
//! macro outcomes and bus-module state sequences.
//!
//! 每个能力特质的进程内实现，供测试套件、criterion 基准测试和 CLI 的
//! `--simulated` 模式使用。每个设备的行为都可编排：连接失败、延迟、
//! 预设的宏结果以及总线模块状态序列。

use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::config::BenchConfig;
use crate::core::execution::{FunctionTable, Verdict};
use crate::core::models::{DeviceClass, ParamsExt};
use crate::hardware::registry::RegistryBuilder;
use crate::hardware::traits::{
    BusSimulator, Camera, Capability, MacroOutcome, ModuleState, PowerSupply, Terminal, Tracer,
};

/// Connection state and counters shared by every simulated device.
/// 所有模拟设备共享的连接状态与计数器。
#[derive(Debug, Default)]
struct SimState {
    connected: AtomicBool,
    fail_connect: AtomicBool,
    resets: AtomicUsize,
}

impl SimState {
    fn connect(&self) -> Result<()> {
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("simulated connect failure");
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

macro_rules! impl_capability {
    ($type:ty, $class:expr) => {
        impl Capability for $type {
            fn class(&self) -> DeviceClass {
                $class
            }

            fn connect(&self) -> Result<()> {
                self.state.connect()
            }

            fn is_available(&self) -> bool {
                self.state.connected.load(Ordering::SeqCst)
            }

            fn abort_and_reset(&self) -> Result<()> {
                self.state.resets.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Power supply
// ---------------------------------------------------------------------------

/// Simulated programmable power supply. Measured voltage tracks the last set
/// voltage while the output is on.
#[derive(Debug, Default)]
pub struct SimPowerSupply {
    state: SimState,
    voltage: Mutex<f64>,
    output_on: AtomicBool,
}

impl SimPowerSupply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `connect()` fail, for unavailability scenarios.
    pub fn fail_connect(self) -> Self {
        self.state.fail_connect.store(true, Ordering::SeqCst);
        self
    }

    /// How many times `abort_and_reset` ran.
    pub fn reset_count(&self) -> usize {
        self.state.resets.load(Ordering::SeqCst)
    }
}

impl_capability!(SimPowerSupply, DeviceClass::Power);

impl PowerSupply for SimPowerSupply {
    fn set_voltage(&self, volts: f64) -> Result<()> {
        *self.voltage.lock().expect("sim lock poisoned") = volts;
        Ok(())
    }

    fn set_current(&self, _amps: f64) -> Result<()> {
        Ok(())
    }

    fn output_on(&self) -> Result<()> {
        self.output_on.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn output_off(&self) -> Result<()> {
        self.output_on.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn measure_voltage(&self) -> Result<f64> {
        if self.output_on.load(Ordering::SeqCst) {
            Ok(*self.voltage.lock().expect("sim lock poisoned"))
        } else {
            Ok(0.0)
        }
    }

    fn power_cycle(&self, off_secs: f64) -> Result<()> {
        self.output_off()?;
        std::thread::sleep(Duration::from_secs_f64(off_secs.min(2.0)));
        self.output_on()
    }
}

// ---------------------------------------------------------------------------
// Tracer
// ---------------------------------------------------------------------------

/// Simulated debugger scripting engine with a canned outcome and latency.
/// 带预设结果与延迟的模拟调试器脚本引擎。
#[derive(Debug)]
pub struct SimTracer {
    state: SimState,
    outcome: Mutex<MacroOutcome>,
    latency: Mutex<Duration>,
}

impl Default for SimTracer {
    fn default() -> Self {
        Self {
            state: SimState::default(),
            outcome: Mutex::new(MacroOutcome::Completed),
            latency: Mutex::new(Duration::ZERO),
        }
    }
}

impl SimTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(self, outcome: MacroOutcome) -> Self {
        *self.outcome.lock().expect("sim lock poisoned") = outcome;
        self
    }

    /// Every `run_macro` call blocks for `latency` before reporting.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().expect("sim lock poisoned") = latency;
        self
    }

    pub fn fail_connect(self) -> Self {
        self.state.fail_connect.store(true, Ordering::SeqCst);
        self
    }

    pub fn reset_count(&self) -> usize {
        self.state.resets.load(Ordering::SeqCst)
    }
}

impl_capability!(SimTracer, DeviceClass::Tracer);

impl Tracer for SimTracer {
    fn run_macro(&self, script: &Path, _params: &crate::core::models::TestParams) -> Result<MacroOutcome> {
        if !self.is_available() {
            bail!("tracer not connected");
        }
        let latency = *self.latency.lock().expect("sim lock poisoned");
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        let _ = script; // The simulator does not interpret script contents.
        Ok(self.outcome.lock().expect("sim lock poisoned").clone())
    }
}

// ---------------------------------------------------------------------------
// Serial terminal
// ---------------------------------------------------------------------------

/// Simulated serial terminal: tests feed received lines in, the pump drains
/// them out; sent lines are recorded.
#[derive(Debug)]
pub struct SimTerminal {
    state: SimState,
    name: String,
    rx: Mutex<VecDeque<String>>,
    sent: Mutex<Vec<String>>,
}

impl SimTerminal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: SimState::default(),
            name: name.into(),
            rx: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Simulates the target emitting one line on this channel.
    /// 模拟目标设备在此通道上输出一行。
    pub fn feed_line(&self, line: impl Into<String>) {
        self.rx.lock().expect("sim lock poisoned").push_back(line.into());
    }

    pub fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().expect("sim lock poisoned").clone()
    }
}

impl_capability!(SimTerminal, DeviceClass::Terminal);

impl Terminal for SimTerminal {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_line(&self, line: &str) -> Result<()> {
        if !self.is_available() {
            bail!("terminal '{}' not connected", self.name);
        }
        self.sent.lock().expect("sim lock poisoned").push(line.to_string());
        Ok(())
    }

    fn try_read_line(&self) -> Result<Option<String>> {
        Ok(self.rx.lock().expect("sim lock poisoned").pop_front())
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Simulated evidence camera: snapshots are small placeholder files.
#[derive(Debug, Default)]
pub struct SimCamera {
    state: SimState,
    counter: AtomicUsize,
}

impl SimCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl_capability!(SimCamera, DeviceClass::Camera);

impl Camera for SimCamera {
    fn snapshot(&self, dir: &Path, label: &str) -> Result<PathBuf> {
        if !self.is_available() {
            bail!("camera not connected");
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let sanitized: String = label
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let path = dir.join(format!("{sanitized}_{n:03}.png"));
        fs::write(&path, b"simulated frame")?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Bus simulator
// ---------------------------------------------------------------------------

/// Simulated bus-simulation tool. Each known module carries a sequence of
/// states returned by successive polls; the final state repeats.
///
/// 模拟总线仿真工具。每个已知模块携带一个状态序列，由连续轮询依次
/// 返回；最后一个状态会一直重复。
#[derive(Debug, Default)]
pub struct SimBus {
    state: SimState,
    modules: Mutex<BTreeMap<String, VecDeque<ModuleState>>>,
    measuring: AtomicBool,
    stopped: Mutex<Vec<String>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module with its poll-state sequence.
    pub fn with_module(self, name: impl Into<String>, states: Vec<ModuleState>) -> Self {
        self.modules
            .lock()
            .expect("sim lock poisoned")
            .insert(name.into(), states.into());
        self
    }

    /// Modules the dispatcher asked to stop (deadline or cancellation).
    pub fn stopped_modules(&self) -> Vec<String> {
        self.stopped.lock().expect("sim lock poisoned").clone()
    }

    /// Whether a measurement is currently active.
    pub fn is_measuring(&self) -> bool {
        self.measuring.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) -> usize {
        self.state.resets.load(Ordering::SeqCst)
    }
}

impl_capability!(SimBus, DeviceClass::Bus);

impl BusSimulator for SimBus {
    fn start_measurement(&self) -> Result<()> {
        self.measuring.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_measurement(&self) -> Result<()> {
        self.measuring.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn start_module(&self, module: &str) -> Result<()> {
        if !self.modules.lock().expect("sim lock poisoned").contains_key(module) {
            bail!("no test module '{module}' in the open configuration");
        }
        Ok(())
    }

    fn module_state(&self, module: &str) -> Result<ModuleState> {
        let mut modules = self.modules.lock().expect("sim lock poisoned");
        let states = modules
            .get_mut(module)
            .ok_or_else(|| anyhow!("no test module '{module}' in the open configuration"))?;
        if states.len() > 1 {
            Ok(states.pop_front().expect("length was just checked"))
        } else {
            Ok(states.front().cloned().unwrap_or(ModuleState::Running))
        }
    }

    fn stop_module(&self, module: &str) -> Result<()> {
        self.stopped.lock().expect("sim lock poisoned").push(module.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bench assembly
// ---------------------------------------------------------------------------

/// Builds a registry of simulated devices mirroring the configured bench:
/// one sim per configured device section, with benign default behavior.
///
/// 构建与配置台架对应的模拟设备注册表：
/// 每个已配置的设备节对应一个模拟设备，行为为良性默认值。
pub fn simulated_registry(config: &BenchConfig) -> RegistryBuilder {
    let mut builder = RegistryBuilder::new();
    if config.devices.power.is_some() {
        builder = builder.power(Arc::new(SimPowerSupply::new()));
    }
    if config.devices.tracer.is_some() {
        builder = builder.tracer(Arc::new(SimTracer::new()));
    }
    for terminal in &config.devices.terminals {
        builder = builder.terminal(Arc::new(SimTerminal::new(terminal.name.clone())));
    }
    if config.devices.camera.is_some() {
        builder = builder.camera(Arc::new(SimCamera::new()));
    }
    if config.devices.bus.is_some() {
        let bus = SimBus::new().with_module(
            "smoke",
            vec![ModuleState::Running, ModuleState::Passed],
        );
        builder = builder.bus(Arc::new(bus));
    }
    builder
}

/// The built-in function tests available in simulated mode. These mirror the
/// kind of checks a bench integration registers: they only talk to the
/// capability traits, so they run unchanged against real drivers.
///
/// 模拟模式下可用的内置函数测试。它们对应台架集成注册的那类检查：
/// 只与能力特质交互，因此在真实驱动上也能原样运行。
pub fn demo_function_table() -> FunctionTable {
    let mut table = FunctionTable::new();

    // Sets the supply to `target_volts`, enables the output and verifies the
    // readback stays within `tolerance`.
    table.register("boot_voltage_check", |ctx| {
        let target = ctx.params.get_f64("target_volts").unwrap_or(12.0);
        let tolerance = ctx.params.get_f64("tolerance").unwrap_or(0.5);
        let current_limit = ctx.params.get_f64("current_limit_amps").unwrap_or(1.0);
        let power = ctx.registry.power()?;
        power.set_voltage(target)?;
        power.set_current(current_limit)?;
        power.output_on()?;
        let measured = power.measure_voltage()?;
        if (measured - target).abs() <= tolerance {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::Fail(format!(
                "measured {measured:.2} V, expected {target:.2} V ± {tolerance:.2} V"
            )))
        }
    });

    // Power-cycles the target and confirms the output came back up.
    table.register("power_cycle_check", |ctx| {
        let off_secs = ctx.params.get_f64("off_secs").unwrap_or(1.0);
        let power = ctx.registry.power()?;
        power.power_cycle(off_secs)?;
        let measured = power.measure_voltage()?;
        if measured > 0.0 {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::Fail("output did not come back after cycle".into()))
        }
    });

    // Captures one camera frame into the session's evidence directory.
    table.register("camera_evidence_check", |ctx| {
        let label = ctx.params.get_str("label").unwrap_or("evidence");
        let camera = ctx.registry.camera()?;
        let path = camera.snapshot(ctx.evidence_dir, label)?;
        Ok(Verdict::PassWith(format!("captured {}", path.display())))
    });

    table
}
