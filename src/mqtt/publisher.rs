use rumqttc::{AsyncClient, QoS};
use thiserror::Error;
use tracing::debug;

/// The broker refused or could not accept a publication
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Publishing to {topic} failed: {reason}")]
pub struct TransportError {
    pub topic: String,
    pub reason: String,
}

impl TransportError {
    pub fn new(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

/// Outgoing side of the transport, as seen by the correlation gate
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;
}

/// Publishes through a `rumqttc` client
///
/// `try_publish` only enqueues the request; the event loop task of the same
/// connection puts it on the wire. Never blocks.
#[derive(Clone, Debug)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, qos: QoS) -> Self {
        Self { client, qos }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        debug!("Enqueueing publish on {} ({} bytes)", topic, payload.len());
        self.client
            .try_publish(topic, self.qos, false, payload.as_bytes().to_vec())
            .map_err(|e| TransportError::new(topic, e.to_string()))
    }
}
