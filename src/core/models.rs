//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the HIL runner:
//! test descriptors, run records, summaries, engine events, and the typed
//! error taxonomy of the execution engine.
//!
//! 此模块定义了整个 HIL 运行器中使用的核心数据结构：
//! 测试描述符、运行记录、摘要、引擎事件以及执行引擎的类型化错误分类。

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The device classes a bench session can hold one connected handle for.
/// 台架会话可以为其持有一个已连接句柄的设备类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Programmable power supply / 可编程电源
    Power,
    /// In-circuit debugger/tracer scripting engine / 在线调试器脚本引擎
    Tracer,
    /// Serial terminal channel(s) / 串口终端通道
    Terminal,
    /// Evidence camera / 取证摄像头
    Camera,
    /// CAN-bus simulation tool / CAN 总线仿真工具
    Bus,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Power => "power",
            DeviceClass::Tracer => "tracer",
            DeviceClass::Terminal => "terminal",
            DeviceClass::Camera => "camera",
            DeviceClass::Bus => "bus",
        };
        write!(f, "{name}")
    }
}

/// The three structurally different test kinds the dispatcher unifies.
/// Selection is an exhaustive match on this enum, never a kind string.
///
/// 调度器统一的三种结构不同的测试类型。
/// 选择是对此枚举的穷尽匹配，而不是类型字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// A registered native test function invoked with the parameter map and
    /// the capability registry.
    /// 一个已注册的本地测试函数，调用时传入参数映射和能力注册表。
    Function,
    /// A debugger macro script executed by the tracer's scripting engine.
    /// 由跟踪器脚本引擎执行的调试器宏脚本。
    MacroScript,
    /// A named test module inside an already-open bus-simulator configuration.
    /// 已打开的总线仿真器配置中的命名测试模块。
    BusModule,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestKind::Function => "function",
            TestKind::MacroScript => "macro_script",
            TestKind::BusModule => "bus_module",
        };
        write!(f, "{name}")
    }
}

/// Session-unique descriptor identity. Assigned by the queue from a
/// monotonically increasing counter and never reused within a session.
/// 会话内唯一的描述符标识。由队列从单调递增计数器分配，会话内绝不复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId(pub u64);

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scalar parameter value passed into a test.
/// 传递给测试的标量参数值。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// String-keyed parameter mapping handed to every strategy invocation.
/// 传递给每次策略调用的字符串键参数映射。
pub type TestParams = BTreeMap<String, ParamValue>;

/// Convenience accessors used by test functions. The float getter coerces
/// from `Int` since TOML authors rarely distinguish `12` from `12.0`.
pub trait ParamsExt {
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
}

impl ParamsExt for TestParams {
    fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(ParamValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(ParamValue::Float(v)) => Some(*v),
            Some(ParamValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Everything needed to enqueue a test, minus the identity the queue assigns.
/// 入队一个测试所需的全部内容，但不含由队列分配的标识。
#[derive(Debug, Clone)]
pub struct TestSpec {
    /// Human-readable label / 人类可读的标签
    pub name: String,
    /// Which execution strategy the dispatcher selects / 调度器选择的执行策略
    pub kind: TestKind,
    /// Script path or logical name, depending on `kind`.
    /// 脚本路径或逻辑名称，取决于 `kind`。
    pub reference: String,
    /// Parameters passed to the strategy / 传递给策略的参数
    pub params: TestParams,
    /// Hard per-test deadline enforced by the dispatcher.
    /// 由调度器强制执行的单测试硬截止时间。
    pub timeout: Duration,
    /// Additional attempts on a FAILED outcome (errors are not retried).
    /// FAILED 结果的额外尝试次数（错误不重试）。
    pub retries: u8,
    /// The device class this test primarily exercises; reset after a timeout.
    /// 此测试主要使用的设备类别；超时后会被复位。
    pub device: Option<DeviceClass>,
}

/// A queued test definition. Immutable once a run has started consuming it.
/// 一个已入队的测试定义。一旦运行开始消费它即不可变。
#[derive(Debug, Clone)]
pub struct TestDescriptor {
    pub id: DescriptorId,
    pub spec: TestSpec,
}

/// Terminal status of one executed descriptor.
/// 一个已执行描述符的终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Cancelled,
    Skipped,
}

impl TestStatus {
    /// `true` for statuses that should fail a CI-style run.
    pub fn is_bad(self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Error => "ERROR",
            TestStatus::Cancelled => "CANCELLED",
            TestStatus::Skipped => "SKIPPED",
        };
        write!(f, "{name}")
    }
}

/// The immutable outcome of one executed descriptor. Append-only once written;
/// the ordered sequence of these records is the session's result ledger.
///
/// 一个已执行描述符的不可变结果。写入后仅追加；
/// 这些记录的有序序列就是会话的结果台账。
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: DescriptorId,
    pub name: String,
    pub status: TestStatus,
    pub started_at: chrono::DateTime<chrono::Local>,
    pub finished_at: chrono::DateTime<chrono::Local>,
    pub duration: Duration,
    /// Free-text message / exception summary / 自由文本消息或异常摘要
    pub message: String,
}

/// Read-only aggregate over a result ledger.
/// 结果台账的只读聚合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub skipped: usize,
    pub wall_clock: Duration,
}

/// Events published to engine subscribers. The subscription is a lazy,
/// unbounded, non-restartable sequence.
///
/// 发布给引擎订阅者的事件。订阅是一个惰性的、无界的、不可重启的序列。
#[derive(Debug, Clone)]
pub enum EngineEvent {
    RunStarted { queued: usize },
    TestStarted { id: DescriptorId, name: String },
    TestFinished { record: RunRecord },
    /// A line captured on a named log channel (controller or serial terminal).
    /// 在命名日志通道（控制器或串口终端）上捕获的一行。
    LogLine { channel: String, line: String },
    RunFinished { summary: RunSummary },
}

/// Lifecycle of a run controller.
/// 运行控制器的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// The engine's error taxonomy. Errors originating inside a single test are
/// always contained in that test's `RunRecord`; only `Fatal` aborts a run.
///
/// 引擎的错误分类。源自单个测试内部的错误总是被限制在该测试的
/// `RunRecord` 中；只有 `Fatal` 会中止整个运行。
#[derive(Debug, Error)]
pub enum EngineError {
    /// Illegal queue mutation while a run is active.
    #[error("queue cannot be modified while a run is active: {0}")]
    QueueState(String),
    /// `pop_next` on a drained queue.
    #[error("test queue is empty")]
    EmptyQueue,
    /// The capability was never connected (or failed to connect at session start).
    #[error("device '{class}' is not available")]
    DeviceUnavailable { class: DeviceClass },
    /// The per-test deadline elapsed.
    #[error("test exceeded its configured timeout of {}s", limit.as_secs())]
    Timeout { limit: Duration },
    /// The test's own code raised.
    #[error("test runtime error: {0}")]
    TestRuntime(String),
    /// Controller-level failure unrelated to any single test.
    #[error("engine fatal error: {0}")]
    Fatal(String),
}
