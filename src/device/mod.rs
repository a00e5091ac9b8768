//! Simulated device: configuration, trigger decision and lifecycle
//!
//! ```text
//! device/
//! ├── config.rs     - DeviceSettings (raw) and DeviceConfig (validated)
//! ├── mode.rs       - Operating mode derived from the configuration
//! ├── latch.rs      - Consume-once "expected message observed" flag
//! ├── gate.rs       - Correlation gate: trigger decision and response
//! ├── runtime.rs    - Connection lifecycle state machine and worker task
//! ├── simulator.rs  - IoTDevice handle used by test code
//! └── error.rs      - DeviceError
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod latch;
pub mod mode;
pub mod runtime;
pub mod simulator;

pub use config::{DeviceConfig, DeviceSettings};
pub use error::DeviceError;
pub use gate::{CorrelationGate, Delivery};
pub use latch::Latch;
pub use mode::Mode;
pub use runtime::{DeviceRuntime, RuntimeState};
pub use simulator::IoTDevice;
