//! # Run Controller Module / 运行控制器模块
//!
//! Owns one bench session end to end: the test queue, the capability
//! registry, the session logger, the result ledger and the single worker
//! that consumes the queue. Exactly one test executes at a time; a run moves
//! the controller `Idle → Running → {Completed, Aborted}` and cancellation
//! takes effect between tests, never by killing the worker.
//!
//! 端到端拥有一个台架会话：测试队列、能力注册表、会话日志器、
//! 结果台账以及消费队列的单个工作者。同一时刻恰好执行一个测试；
//! 一次运行使控制器经历 `Idle → Running → {Completed, Aborted}`，
//! 取消在测试之间生效，绝不通过杀死工作者实现。

use anyhow::Result;
use chrono::Local;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::core::execution::{execute, FunctionTable};
use crate::core::ledger::ResultLedger;
use crate::core::models::{
    DescriptorId, EngineError, EngineEvent, RunRecord, RunState, RunSummary, TestDescriptor,
    TestSpec, TestStatus,
};
use crate::core::queue::TestQueue;
use crate::hardware::registry::CapabilityRegistry;
use crate::hardware::serial::spawn_terminal_pump;
use crate::infra::logging::SessionLogger;

/// Fan-out of engine events to any number of subscribers. A subscription is
/// lazy (starts at the next event), unbounded, and ends when its receiver is
/// dropped; closed subscribers are pruned on the next publish.
///
/// 将引擎事件扇出给任意数量的订阅者。订阅是惰性的（从下一个事件开始）、
/// 无界的，接收端被丢弃即结束；已关闭的订阅者在下次发布时被清除。
#[derive(Default)]
pub struct EventBus {
    subscribers: StdMutex<Vec<mpsc::UnboundedSender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiverStream<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.push(tx);
        UnboundedReceiverStream::new(rx)
    }

    pub fn publish(&self, event: EngineEvent) {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// One bench session. Construct with a connected registry and a function
/// table, enqueue tests, then `start_run` and await the returned handle.
/// `close` must only be called after any in-flight run has finished.
///
/// 一个台架会话。用已连接的注册表和函数表构造，入队测试，
/// 然后 `start_run` 并等待返回的句柄。`close` 只能在任何进行中的
/// 运行结束之后调用。
pub struct RunController {
    queue: Arc<Mutex<TestQueue>>,
    ledger: Arc<Mutex<ResultLedger>>,
    state: Arc<Mutex<RunState>>,
    cancel: CancellationToken,
    shutdown: CancellationToken,
    events: Arc<EventBus>,
    registry: Arc<CapabilityRegistry>,
    functions: Arc<FunctionTable>,
    logger: Arc<SessionLogger>,
    pumps: Vec<JoinHandle<()>>,
}

impl RunController {
    /// Opens the session (directory, logs, terminal pumps). Every connected
    /// terminal gets a pump task mirroring its output into `term_<name>.log`
    /// and onto the event bus, whether or not a test is running.
    ///
    /// 打开会话（目录、日志、终端泵）。每个已连接的终端都会获得一个泵
    /// 任务，将其输出镜像到 `term_<name>.log` 和事件总线上，
    /// 无论是否有测试在运行。
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        functions: FunctionTable,
        log_base: &Path,
    ) -> Result<Self> {
        let mut logger = SessionLogger::open(log_base)?;
        let events = Arc::new(EventBus::new());
        let shutdown = CancellationToken::new();

        let mut pumps = Vec::new();
        for (name, terminal) in registry.terminals() {
            let sink = logger.terminal_sink(name)?;
            pumps.push(spawn_terminal_pump(
                Arc::clone(terminal),
                sink,
                Arc::clone(&events),
                shutdown.clone(),
            ));
        }

        for (class, reason) in registry.unavailable() {
            logger.warn(format!("device '{class}' unavailable: {reason}"));
        }
        logger.info(format!(
            "registered test functions: {}",
            functions.names().join(", ")
        ));

        Ok(Self {
            queue: Arc::new(Mutex::new(TestQueue::new())),
            ledger: Arc::new(Mutex::new(ResultLedger::new())),
            state: Arc::new(Mutex::new(RunState::Idle)),
            cancel: CancellationToken::new(),
            shutdown,
            events,
            registry,
            functions: Arc::new(functions),
            logger: Arc::new(logger),
            pumps,
        })
    }

    pub fn session_dir(&self) -> &Path {
        self.logger.session_dir()
    }

    pub async fn add_test(&self, spec: TestSpec) -> Result<DescriptorId, EngineError> {
        let id = self.queue.lock().await.add(spec.clone())?;
        self.logger
            .info(format!("queued {id} '{}' ({})", spec.name, spec.kind));
        Ok(id)
    }

    pub async fn remove_test(&self, id: DescriptorId) -> Result<TestDescriptor, EngineError> {
        let removed = self.queue.lock().await.remove(id)?;
        self.logger
            .info(format!("removed {id} '{}' from the queue", removed.spec.name));
        Ok(removed)
    }

    pub async fn reorder_test(
        &self,
        id: DescriptorId,
        new_index: usize,
    ) -> Result<(), EngineError> {
        self.queue.lock().await.reorder(id, new_index)
    }

    pub async fn clear_queue(&self) -> Result<(), EngineError> {
        self.queue.lock().await.clear()
    }

    pub async fn queue_snapshot(&self) -> Vec<TestDescriptor> {
        self.queue.lock().await.snapshot()
    }

    pub async fn state(&self) -> RunState {
        *self.state.lock().await
    }

    pub async fn records(&self) -> Vec<RunRecord> {
        self.ledger.lock().await.records().to_vec()
    }

    pub async fn summary(&self) -> RunSummary {
        self.ledger.lock().await.summary()
    }

    pub fn subscribe(&self) -> UnboundedReceiverStream<EngineEvent> {
        self.events.subscribe()
    }

    /// Requests cooperative cancellation. The test currently executing runs
    /// to its own conclusion (bus modules notice sooner); every descriptor
    /// still queued is recorded as SKIPPED.
    ///
    /// 请求协作式取消。当前正在执行的测试按其自身结论结束
    /// （总线模块会更早察觉）；仍在队列中的每个描述符被记录为 SKIPPED。
    pub fn request_cancel(&self) {
        self.logger.info("cancellation requested");
        self.cancel.cancel();
    }

    /// A clone of the run-cancellation token, for signal handlers and other
    /// tasks that outlive a borrow of the controller.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Locks the queue and spawns the single run worker. Fails while a run is
    /// already active or when nothing is queued.
    ///
    /// 锁定队列并派生单个运行工作者。已有运行在进行或队列为空时失败。
    pub async fn start_run(&self) -> Result<JoinHandle<RunSummary>, EngineError> {
        {
            let mut state = self.state.lock().await;
            if *state == RunState::Running {
                return Err(EngineError::QueueState(
                    "a run is already active".to_string(),
                ));
            }
            let mut queue = self.queue.lock().await;
            if queue.is_empty() {
                return Err(EngineError::EmptyQueue);
            }
            queue.set_locked(true);
            *state = RunState::Running;
        }

        let queue = Arc::clone(&self.queue);
        let ledger = Arc::clone(&self.ledger);
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let events = Arc::clone(&self.events);
        let registry = Arc::clone(&self.registry);
        let functions = Arc::clone(&self.functions);
        let logger = Arc::clone(&self.logger);

        Ok(tokio::spawn(run_loop(
            queue, ledger, state, cancel, events, registry, functions, logger,
        )))
    }

    /// Tears the session down: stops the terminal pumps and drains the log
    /// writers. Call only after the run handle (if any) has been awaited.
    pub async fn close(self) {
        self.shutdown.cancel();
        for pump in self.pumps {
            let _ = pump.await;
        }
        drop(self.events);
        if let Ok(logger) = Arc::try_unwrap(self.logger) {
            logger.close().await;
        }
    }
}

/// The single worker. Consumes the queue in order, appends exactly one record
/// per descriptor, and transitions the controller to its terminal state. The
/// record being written is never interrupted by cancellation.
#[allow(clippy::too_many_arguments)]
async fn run_loop(
    queue: Arc<Mutex<TestQueue>>,
    ledger: Arc<Mutex<ResultLedger>>,
    state: Arc<Mutex<RunState>>,
    cancel: CancellationToken,
    events: Arc<EventBus>,
    registry: Arc<CapabilityRegistry>,
    functions: Arc<FunctionTable>,
    logger: Arc<SessionLogger>,
) -> RunSummary {
    let queued = queue.lock().await.len();
    logger.info(format!("run started with {queued} queued test(s)"));
    events.publish(EngineEvent::RunStarted { queued });

    let mut aborted = false;
    loop {
        if cancel.is_cancelled() {
            aborted = true;
            break;
        }

        let descriptor = match queue.lock().await.pop_next() {
            Ok(descriptor) => descriptor,
            Err(_) => break,
        };

        logger.info(format!(
            "START {} '{}' ({})",
            descriptor.id, descriptor.spec.name, descriptor.spec.kind
        ));
        events.publish(EngineEvent::TestStarted {
            id: descriptor.id,
            name: descriptor.spec.name.clone(),
        });

        let record = execute(
            &descriptor,
            &registry,
            &functions,
            logger.evidence_dir(),
            &cancel,
        )
        .await;

        finish_record(&ledger, &logger, &events, record).await;
    }

    if aborted {
        // Everything still queued gets its own SKIPPED record so the ledger
        // accounts for every descriptor the run was asked to execute.
        let remaining: Vec<TestDescriptor> = queue.lock().await.drain();
        let now = Local::now();
        for descriptor in remaining {
            let record = RunRecord {
                id: descriptor.id,
                name: descriptor.spec.name.clone(),
                status: TestStatus::Skipped,
                started_at: now,
                finished_at: now,
                duration: std::time::Duration::ZERO,
                message: "skipped after cancellation".to_string(),
            };
            finish_record(&ledger, &logger, &events, record).await;
        }
    }

    let summary = ledger.lock().await.summary();
    {
        let mut queue = queue.lock().await;
        queue.set_locked(false);
    }
    *state.lock().await = if aborted {
        RunState::Aborted
    } else {
        RunState::Completed
    };

    logger.info(format!(
        "run {}: {} passed, {} failed, {} errors, {} cancelled, {} skipped",
        if aborted { "aborted" } else { "completed" },
        summary.passed,
        summary.failed,
        summary.errors,
        summary.cancelled,
        summary.skipped,
    ));
    events.publish(EngineEvent::RunFinished { summary });
    summary
}

async fn finish_record(
    ledger: &Arc<Mutex<ResultLedger>>,
    logger: &Arc<SessionLogger>,
    events: &Arc<EventBus>,
    record: RunRecord,
) {
    logger.info(format!(
        "END   {} '{}' {} in {:.3}s: {}",
        record.id,
        record.name,
        record.status,
        record.duration.as_secs_f64(),
        record.message,
    ));
    logger.log_record(&record);
    ledger.lock().await.append(record.clone());
    events.publish(EngineEvent::TestFinished { record });
}
