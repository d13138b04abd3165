//! # Capability Registry Module / 能力注册表模块
//!
//! The session-scoped set of connected hardware handles. Construction
//! attempts to connect every configured device; a device that fails to
//! connect is recorded as unavailable but does not block session start —
//! tests that need it fail individually, which beats blocking the whole
//! queue on one bad cable.
//!
//! 会话范围内已连接硬件句柄的集合。构造时尝试连接每个已配置的设备；
//! 连接失败的设备被记录为不可用，但不会阻止会话启动 —
//! 需要它的测试会单独失败，这好过因一根坏线缆阻塞整个队列。

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::models::{DeviceClass, EngineError};
use crate::hardware::traits::{BusSimulator, Camera, Capability, PowerSupply, Terminal, Tracer};

/// Builder collecting the handles a bench integration provides.
/// 收集台架集成提供的句柄的构建器。
#[derive(Default)]
pub struct RegistryBuilder {
    power: Option<Arc<dyn PowerSupply>>,
    tracer: Option<Arc<dyn Tracer>>,
    terminals: Vec<Arc<dyn Terminal>>,
    camera: Option<Arc<dyn Camera>>,
    bus: Option<Arc<dyn BusSimulator>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn power<T: PowerSupply + 'static>(mut self, handle: Arc<T>) -> Self {
        self.power = Some(handle);
        self
    }

    pub fn tracer<T: Tracer + 'static>(mut self, handle: Arc<T>) -> Self {
        self.tracer = Some(handle);
        self
    }

    pub fn terminal<T: Terminal + 'static>(mut self, handle: Arc<T>) -> Self {
        self.terminals.push(handle);
        self
    }

    pub fn camera<T: Camera + 'static>(mut self, handle: Arc<T>) -> Self {
        self.camera = Some(handle);
        self
    }

    pub fn bus<T: BusSimulator + 'static>(mut self, handle: Arc<T>) -> Self {
        self.bus = Some(handle);
        self
    }

    /// Connects every provided handle. Connect failures demote the handle to
    /// "unavailable" with the error retained for later messages; the handle
    /// itself is dropped so nothing can call a half-connected device.
    ///
    /// 连接每个提供的句柄。连接失败会把句柄降级为"不可用"，
    /// 并保留错误用于之后的消息；句柄本身被丢弃，
    /// 因此任何代码都无法调用半连接状态的设备。
    pub fn connect_all(self) -> CapabilityRegistry {
        let mut unavailable = BTreeMap::new();

        fn try_connect<T: Capability + ?Sized>(
            handle: Option<Arc<T>>,
            unavailable: &mut BTreeMap<DeviceClass, String>,
        ) -> Option<Arc<T>> {
            let handle = handle?;
            match handle.connect() {
                Ok(()) => Some(handle),
                Err(e) => {
                    unavailable.insert(handle.class(), e.to_string());
                    None
                }
            }
        }

        let power = try_connect(self.power, &mut unavailable);
        let tracer = try_connect(self.tracer, &mut unavailable);
        let camera = try_connect(self.camera, &mut unavailable);
        let bus = try_connect(self.bus, &mut unavailable);

        let mut terminals = BTreeMap::new();
        for terminal in self.terminals {
            match terminal.connect() {
                Ok(()) => {
                    terminals.insert(terminal.name().to_string(), terminal);
                }
                Err(e) => {
                    // One broken terminal must not hide the others; keep the
                    // first failure reason for the class.
                    unavailable
                        .entry(DeviceClass::Terminal)
                        .or_insert_with(|| format!("{}: {e}", terminal.name()));
                }
            }
        }

        CapabilityRegistry {
            power,
            tracer,
            terminals,
            camera,
            bus,
            unavailable,
        }
    }
}

/// One live handle per device class, shared by reference across every test in
/// the session and owned by the session itself. At most one test runs at a
/// time, so exclusivity per handle is structural, not lock-based.
///
/// 每个设备类别一个活动句柄，在会话内所有测试间按引用共享，
/// 由会话本身拥有。同一时刻最多只有一个测试在运行，
/// 因此句柄的独占性是结构性的，而非基于锁。
pub struct CapabilityRegistry {
    power: Option<Arc<dyn PowerSupply>>,
    tracer: Option<Arc<dyn Tracer>>,
    terminals: BTreeMap<String, Arc<dyn Terminal>>,
    camera: Option<Arc<dyn Camera>>,
    bus: Option<Arc<dyn BusSimulator>>,
    unavailable: BTreeMap<DeviceClass, String>,
}

impl CapabilityRegistry {
    /// An empty registry (every class unavailable); handy for tests.
    pub fn empty() -> Self {
        RegistryBuilder::new().connect_all()
    }

    pub fn power(&self) -> Result<Arc<dyn PowerSupply>, EngineError> {
        self.power.clone().ok_or(EngineError::DeviceUnavailable {
            class: DeviceClass::Power,
        })
    }

    pub fn tracer(&self) -> Result<Arc<dyn Tracer>, EngineError> {
        self.tracer.clone().ok_or(EngineError::DeviceUnavailable {
            class: DeviceClass::Tracer,
        })
    }

    pub fn terminal(&self, name: &str) -> Result<Arc<dyn Terminal>, EngineError> {
        self.terminals
            .get(name)
            .cloned()
            .ok_or(EngineError::DeviceUnavailable {
                class: DeviceClass::Terminal,
            })
    }

    /// Connected terminal channels, keyed by channel name.
    pub fn terminals(&self) -> &BTreeMap<String, Arc<dyn Terminal>> {
        &self.terminals
    }

    pub fn camera(&self) -> Result<Arc<dyn Camera>, EngineError> {
        self.camera.clone().ok_or(EngineError::DeviceUnavailable {
            class: DeviceClass::Camera,
        })
    }

    pub fn bus(&self) -> Result<Arc<dyn BusSimulator>, EngineError> {
        self.bus.clone().ok_or(EngineError::DeviceUnavailable {
            class: DeviceClass::Bus,
        })
    }

    pub fn available(&self, class: DeviceClass) -> bool {
        match class {
            DeviceClass::Power => self.power.is_some(),
            DeviceClass::Tracer => self.tracer.is_some(),
            DeviceClass::Terminal => !self.terminals.is_empty(),
            DeviceClass::Camera => self.camera.is_some(),
            DeviceClass::Bus => self.bus.is_some(),
        }
    }

    /// Devices that were configured but failed to connect, with the reason.
    /// 已配置但连接失败的设备，及其原因。
    pub fn unavailable(&self) -> &BTreeMap<DeviceClass, String> {
        &self.unavailable
    }

    /// Best-effort abort/reset of one device class, used by the dispatcher's
    /// timeout path. Terminals are reset collectively.
    pub fn abort_and_reset(&self, class: DeviceClass) -> anyhow::Result<()> {
        match class {
            DeviceClass::Power => self.power()?.abort_and_reset(),
            DeviceClass::Tracer => self.tracer()?.abort_and_reset(),
            DeviceClass::Camera => self.camera()?.abort_and_reset(),
            DeviceClass::Bus => self.bus()?.abort_and_reset(),
            DeviceClass::Terminal => {
                for terminal in self.terminals.values() {
                    terminal.abort_and_reset()?;
                }
                Ok(())
            }
        }
    }
}
