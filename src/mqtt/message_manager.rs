use chrono::{DateTime, Local};
use std::fmt;

const PREVIEW_CHARS: usize = 40;

/// A PUBLISH received on the device's subscription, on its way to the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub topic: String,
    pub payload: String,
    pub received_at: DateTime<Local>,
}

impl fmt::Display for DeliveredMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.payload.chars().take(PREVIEW_CHARS).collect();
        let ellipsis = if self.payload.chars().count() > PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        write!(
            f,
            "{} - {}: {}{}",
            self.received_at.format("%H:%M:%S%.3f"),
            self.topic,
            preview,
            ellipsis
        )
    }
}

impl DeliveredMessage {
    pub fn from_topic(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        DeliveredMessage {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Local::now(),
        }
    }

    /// Payload on one line, for log lines
    pub fn minimized_payload(&self) -> String {
        compact_payload(&self.payload)
    }
}

/// Compact JSON rendering of `payload`; non-JSON text is only trimmed.
pub fn compact_payload(payload: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => value.to_string(),
        Err(_) => payload.trim().to_string(),
    }
}
