//! # iotsim - MQTT IoT device simulator for test automation
//!
//! A simulated device listens on a topic, decides whether an incoming message
//! is the expected trigger and, if so, answers with a correlated message built
//! from a JSON template. Values captured from the trigger by a JSON mask are
//! filled into the template with their JSON types preserved.
//!
//! ## Modules
//!
//! - [`parser`] - mask matching, parameter extraction, template substitution
//! - [`device`] - configuration, correlation gate, latch, device lifecycle
//! - [`mqtt`] - `rumqttc` transport: broker settings, event loop, publisher
//! - [`config`] - TOML file with the broker and the devices to simulate
//!
//! ## Example
//!
//! ```
//! use iotsim::parser::{match_mask, substitute};
//! use serde_json::json;
//!
//! let mask = json!({"uuid": "{id}", "data": {"running": "{state}"}});
//! let trigger = json!({"uuid": "af23", "data": {"running": true, "since": 12}});
//!
//! let params = match_mask(&mask, &trigger, false).unwrap();
//! let response = substitute(&json!({"device": "{id}", "on": "{state}"}), &params);
//! assert_eq!(response, json!({"device": "af23", "on": true}));
//! ```

pub mod config;
pub mod device;
pub mod mqtt;
pub mod parser;

pub use config::{ConfigError, SimulatorConfig};
pub use device::{DeviceConfig, DeviceError, DeviceSettings, IoTDevice, Mode};
pub use mqtt::BrokerSettings;
