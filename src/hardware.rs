//! # Hardware Module / 硬件模块
//!
//! This module defines the capability traits the engine consumes, the
//! session-scoped registry of connected handles, the serial terminal pumps,
//! and the simulated bench used for development and tests.
//!
//! 此模块定义了引擎消费的能力特质、会话范围内已连接句柄的注册表、
//! 串口终端泵，以及用于开发和测试的模拟台架。

pub mod registry;
pub mod serial;
pub mod sim;
pub mod traits;

// Re-exports
pub use registry::{CapabilityRegistry, RegistryBuilder};
pub use traits::{BusSimulator, Camera, Capability, PowerSupply, Terminal, Tracer};
