//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! The polymorphic dispatcher: given a descriptor's kind, it invokes the
//! matching execution strategy (registered function, debugger macro script,
//! or bus-simulator module) inside a cancellable, time-bounded envelope and
//! produces exactly one `RunRecord`.
//!
//! Timeout semantics differ by kind and are deliberate: function and
//! macro-script strategies run the blocking hardware call on a dedicated
//! blocking thread and are abandoned preemptively when the deadline elapses
//! (the underlying call may keep running on its thread — the device is then
//! recovered via `abort_and_reset`). Bus-module strategies poll, so their
//! deadline is advisory and checked between polls.
//!
//! 多态调度器：根据描述符的类型调用匹配的执行策略（注册函数、调试器宏
//! 脚本或总线仿真器模块），在可取消、有时限的外壳内运行，并恰好产生一条
//! `RunRecord`。超时语义按类型区分：函数与宏脚本策略在专用阻塞线程上
//! 运行并在截止时被抢占式放弃（底层调用可能仍在其线程上运行，随后通过
//! `abort_and_reset` 恢复设备）；总线模块策略使用轮询，其截止时间为
//! 建议性的，在轮询间隙检查。

use anyhow::Result;
use chrono::Local;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::core::models::{
    DeviceClass, EngineError, RunRecord, TestDescriptor, TestKind, TestParams, TestStatus,
};
use crate::hardware::registry::CapabilityRegistry;
use crate::hardware::traits::{MacroOutcome, ModuleState};

/// Interval between bus-module state polls. Cancellation and the advisory
/// deadline are both observed at this granularity.
pub const MODULE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a registered test function reports back.
/// 注册测试函数的返回结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Pass with a message worth keeping in the record.
    PassWith(String),
    Fail(String),
}

/// Everything a test function may touch: its parameters, the session's
/// capability registry, and the camera-evidence directory. Passed explicitly —
/// there is no ambient or global lookup.
///
/// 测试函数可以接触的全部内容：其参数、会话的能力注册表以及摄像头取证
/// 目录。显式传入 — 不存在任何环境式或全局查找。
pub struct TestContext<'a> {
    pub params: &'a TestParams,
    pub registry: &'a CapabilityRegistry,
    pub evidence_dir: &'a Path,
}

type TestFn = dyn Fn(&TestContext<'_>) -> Result<Verdict> + Send + Sync;

/// The session's registry of named test functions. Function-kind descriptors
/// reference entries here by logical name.
/// 会话的命名测试函数注册表。函数类型的描述符按逻辑名称引用其中的条目。
#[derive(Default)]
pub struct FunctionTable {
    functions: BTreeMap<String, Arc<TestFn>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&TestContext<'_>) -> Result<Verdict> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Arc<TestFn>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

/// Executes one descriptor to a terminal status. A FAILED attempt is retried
/// up to `retries` times; errors, timeouts and cancellations are final.
/// Nothing a test does — fail, hang, panic — escapes this function.
///
/// 将一个描述符执行到终态。FAILED 的尝试最多重试 `retries` 次；
/// 错误、超时与取消是最终结果。测试的任何行为 — 失败、挂起、panic —
/// 都不会逃出此函数。
pub async fn execute(
    descriptor: &TestDescriptor,
    registry: &Arc<CapabilityRegistry>,
    functions: &Arc<FunctionTable>,
    evidence_dir: &Path,
    cancel: &CancellationToken,
) -> RunRecord {
    let spec = &descriptor.spec;
    let started_at = Local::now();
    let start = Instant::now();

    let max_attempts = 1 + u32::from(spec.retries);
    let mut attempt = 1;
    let (status, mut message) = loop {
        let outcome = match spec.kind {
            TestKind::Function => {
                run_function(descriptor, registry, functions, evidence_dir).await
            }
            TestKind::MacroScript => run_macro_script(descriptor, registry).await,
            TestKind::BusModule => run_bus_module(descriptor, registry, cancel).await,
        };
        if outcome.0 == TestStatus::Failed && attempt < max_attempts {
            attempt += 1;
            continue;
        }
        break outcome;
    };

    if attempt > 1 {
        message.push_str(&format!(" (attempt {attempt}/{max_attempts})"));
    }

    RunRecord {
        id: descriptor.id,
        name: spec.name.clone(),
        status,
        started_at,
        finished_at: Local::now(),
        duration: start.elapsed(),
        message,
    }
}

/// Runs a registered test function on a blocking worker under the deadline.
async fn run_function(
    descriptor: &TestDescriptor,
    registry: &Arc<CapabilityRegistry>,
    functions: &Arc<FunctionTable>,
    evidence_dir: &Path,
) -> (TestStatus, String) {
    let spec = &descriptor.spec;
    let Some(function) = functions.get(&spec.reference) else {
        return (
            TestStatus::Error,
            format!("no registered test function '{}'", spec.reference),
        );
    };

    let registry_for_call = Arc::clone(registry);
    let params = spec.params.clone();
    let evidence: PathBuf = evidence_dir.to_path_buf();
    let handle = task::spawn_blocking(move || {
        let ctx = TestContext {
            params: &params,
            registry: &registry_for_call,
            evidence_dir: &evidence,
        };
        function(&ctx)
    });

    match timeout(spec.timeout, handle).await {
        // Deadline elapsed: the JoinHandle is dropped and the blocking call
        // abandoned on its worker thread; recover the device it was using.
        Err(_) => timed_out(spec.timeout, spec.device, registry).await,
        Ok(Err(join_err)) => {
            let message = if join_err.is_panic() {
                format!("test function panicked: {join_err}")
            } else {
                format!("test function was aborted: {join_err}")
            };
            (TestStatus::Error, message)
        }
        Ok(Ok(Ok(Verdict::Pass))) => (TestStatus::Passed, "OK".to_string()),
        Ok(Ok(Ok(Verdict::PassWith(message)))) => (TestStatus::Passed, message),
        Ok(Ok(Ok(Verdict::Fail(reason)))) => (TestStatus::Failed, reason),
        Ok(Ok(Err(e))) => (
            TestStatus::Error,
            EngineError::TestRuntime(format!("{e:#}")).to_string(),
        ),
    }
}

/// Hands a macro script to the tracer's engine and waits for its completion
/// signal. Engine-reported abnormal termination is an ERROR, per contract;
/// script output is never parsed.
async fn run_macro_script(
    descriptor: &TestDescriptor,
    registry: &Arc<CapabilityRegistry>,
) -> (TestStatus, String) {
    let spec = &descriptor.spec;
    let tracer = match registry.tracer() {
        Ok(tracer) => tracer,
        Err(e) => return (TestStatus::Error, e.to_string()),
    };

    let script = PathBuf::from(&spec.reference);
    let params = spec.params.clone();
    let handle = task::spawn_blocking(move || tracer.run_macro(&script, &params));

    match timeout(spec.timeout, handle).await {
        Err(_) => timed_out(spec.timeout, spec.device, registry).await,
        Ok(Err(join_err)) => (
            TestStatus::Error,
            format!("macro invocation aborted: {join_err}"),
        ),
        Ok(Ok(Ok(MacroOutcome::Completed))) => {
            (TestStatus::Passed, "macro completed".to_string())
        }
        Ok(Ok(Ok(MacroOutcome::Aborted(reason)))) => (
            TestStatus::Error,
            format!("scripting engine aborted: {reason}"),
        ),
        Ok(Ok(Err(e))) => (
            TestStatus::Error,
            EngineError::TestRuntime(format!("{e:#}")).to_string(),
        ),
    }
}

/// Triggers a bus-simulator module and polls it to a terminal state. The
/// simulator runs the module in its own process, so the worker stays
/// responsive to cancellation between polls.
async fn run_bus_module(
    descriptor: &TestDescriptor,
    registry: &Arc<CapabilityRegistry>,
    cancel: &CancellationToken,
) -> (TestStatus, String) {
    let spec = &descriptor.spec;
    let bus = match registry.bus() {
        Ok(bus) => bus,
        Err(e) => return (TestStatus::Error, e.to_string()),
    };

    // A module only runs inside an active measurement.
    if let Err(e) = bus.start_measurement() {
        return (TestStatus::Error, format!("{e:#}"));
    }
    if let Err(e) = bus.start_module(&spec.reference) {
        let _ = bus.stop_measurement();
        return (TestStatus::Error, format!("{e:#}"));
    }

    let deadline = Instant::now() + spec.timeout;
    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = bus.stop_module(&spec.reference);
                break (
                    TestStatus::Cancelled,
                    "cancelled while the bus module was running".to_string(),
                );
            }
            _ = sleep(MODULE_POLL_INTERVAL) => {}
        }

        match bus.module_state(&spec.reference) {
            Ok(ModuleState::Running) => {
                if Instant::now() >= deadline {
                    let _ = bus.stop_module(&spec.reference);
                    break timed_out(spec.timeout, spec.device, registry).await;
                }
            }
            Ok(ModuleState::Passed) => {
                break (TestStatus::Passed, "module reported pass".to_string());
            }
            Ok(ModuleState::Failed(reason)) => break (TestStatus::Failed, reason),
            Ok(ModuleState::Errored(reason)) => break (TestStatus::Error, reason),
            Err(e) => break (TestStatus::Error, format!("{e:#}")),
        }
    };
    let _ = bus.stop_measurement();
    outcome
}

/// Builds the timeout outcome and performs the best-effort device recovery.
/// A failed reset is appended to the message but never blocks the queue.
async fn timed_out(
    limit: Duration,
    device: Option<DeviceClass>,
    registry: &Arc<CapabilityRegistry>,
) -> (TestStatus, String) {
    let mut message = EngineError::Timeout { limit }.to_string();
    if let Some(class) = device {
        let registry = Arc::clone(registry);
        let reset = task::spawn_blocking(move || registry.abort_and_reset(class)).await;
        match reset {
            Ok(Ok(())) => message.push_str(&format!("; '{class}' was reset")),
            Ok(Err(e)) => message.push_str(&format!("; reset of '{class}' failed: {e:#}")),
            Err(join_err) => {
                message.push_str(&format!("; reset of '{class}' aborted: {join_err}"));
            }
        }
    }
    (TestStatus::Error, message)
}
