//! # Capability Traits Module / 能力特质模块
//!
//! The narrow contracts the engine consumes from device drivers. The engine
//! never knows how a handle implements its operations; drivers live outside
//! this crate (the in-tree `sim` module provides the simulated bench).
//!
//! 引擎从设备驱动消费的窄契约。引擎不关心句柄如何实现其操作；
//! 驱动位于本 crate 之外（树内的 `sim` 模块提供模拟台架）。

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::models::{DeviceClass, TestParams};

/// Operations every capability handle exposes to the engine. `abort_and_reset`
/// is the best-effort recovery hook the dispatcher calls after a timeout to
/// bring the device back to a known state before the next test; the underlying
/// device may still be mid-operation afterwards.
///
/// 每个能力句柄向引擎暴露的操作。`abort_and_reset` 是调度器在超时后
/// 调用的尽力而为的恢复钩子，用于在下一个测试前把设备带回已知状态；
/// 之后底层设备仍可能处于操作中途。
pub trait Capability: Send + Sync + std::fmt::Debug {
    fn class(&self) -> DeviceClass;

    /// Attempts to bring the handle into the connected state. Called once per
    /// session by the registry; a failure marks the device unavailable but
    /// does not block session start.
    fn connect(&self) -> Result<()>;

    /// `true` while the handle is fully connected and safe to call.
    fn is_available(&self) -> bool;

    /// Best-effort abort of whatever the device is doing, then reset to a
    /// known state. A failure here is logged but never blocks the queue.
    fn abort_and_reset(&self) -> Result<()>;
}

/// Programmable power supply.
/// 可编程电源。
pub trait PowerSupply: Capability {
    fn set_voltage(&self, volts: f64) -> Result<()>;
    fn set_current(&self, amps: f64) -> Result<()>;
    fn output_on(&self) -> Result<()>;
    fn output_off(&self) -> Result<()>;
    fn measure_voltage(&self) -> Result<f64>;
    /// Output off, wait `off_secs`, output on.
    fn power_cycle(&self, off_secs: f64) -> Result<()>;
}

/// The scripting engine's own completion signal for a macro run. The engine
/// never parses script output; this signal alone decides the outcome.
///
/// 脚本引擎自身对一次宏运行的完成信号。引擎从不解析脚本输出；
/// 仅由该信号决定结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroOutcome {
    /// The engine reported the script's exit marker.
    Completed,
    /// The engine reported abnormal termination with its own reason.
    Aborted(String),
}

/// In-circuit debugger/tracer scripting engine.
/// 在线调试器/跟踪器脚本引擎。
pub trait Tracer: Capability {
    /// Runs a macro script to completion, blocking the calling thread.
    /// 阻塞调用线程，运行宏脚本直至完成。
    fn run_macro(&self, script: &Path, params: &TestParams) -> Result<MacroOutcome>;
}

/// One serial terminal channel. The session pumps `try_read_line`
/// continuously into the per-channel log, whether or not a test is running.
///
/// 一个串口终端通道。会话持续将 `try_read_line` 泵入每通道日志，
/// 无论是否有测试在运行。
pub trait Terminal: Capability {
    /// Channel name, used for the per-channel session log file.
    fn name(&self) -> &str;
    fn send_line(&self, line: &str) -> Result<()>;
    /// Non-blocking: the next complete received line, if one is buffered.
    /// 非阻塞：若缓冲区中有完整的一行则返回之。
    fn try_read_line(&self) -> Result<Option<String>>;
}

/// Evidence camera. Snapshots land in the session's `camera/` directory.
/// 取证摄像头。快照落入会话的 `camera/` 目录。
pub trait Camera: Capability {
    fn snapshot(&self, dir: &Path, label: &str) -> Result<PathBuf>;
}

/// State of a bus-simulator test module, polled by the dispatcher because the
/// simulator runs the module asynchronously in its own process.
///
/// 总线仿真器测试模块的状态，由调度器轮询，
/// 因为仿真器在自己的进程中异步运行模块。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    Running,
    Passed,
    Failed(String),
    Errored(String),
}

/// CAN-bus simulation tool with an already-open configuration.
/// 已打开配置的 CAN 总线仿真工具。
pub trait BusSimulator: Capability {
    fn start_measurement(&self) -> Result<()>;
    fn stop_measurement(&self) -> Result<()>;
    /// Resolves `module` against the open configuration and triggers it.
    /// Fails if the configuration has no such module.
    fn start_module(&self, module: &str) -> Result<()>;
    fn module_state(&self, module: &str) -> Result<ModuleState>;
    /// Asks the simulator to stop a still-running module.
    fn stop_module(&self, module: &str) -> Result<()>;
}
