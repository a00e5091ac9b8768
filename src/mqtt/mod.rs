//! # MQTT transport
//!
//! The broker side of a simulated device, built on `rumqttc`:
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker settings and client options
//! ├── message_manager.rs  - Envelope for delivered messages
//! ├── mqtt_handler.rs     - Client creation and the event loop task
//! └── publisher.rs        - The `Publisher` seam used by the gate
//! ```
//!
//! The event loop task only moves bytes. Every decision about what a message
//! means happens in [`crate::device`], which sees the transport through
//! [`Publisher`] and a channel of [`DeliveredMessage`]s.

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;
pub mod publisher;

pub use config::BrokerSettings;
pub use message_manager::{compact_payload, DeliveredMessage};
pub use mqtt_handler::MqttHandler;
pub use publisher::{MqttPublisher, Publisher, TransportError};
