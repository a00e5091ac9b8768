//! Device trigger/response configuration.
//!
//! [`DeviceSettings`] is the loose, serde-friendly record read from TOML or
//! filled in by test code. [`DeviceConfig`] is its validated form: JSON
//! fields are parsed once, and the value is never mutated afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConfigError;

use super::mode::Mode;

const UNNAMED_DEVICE: &str = "device";

/// Raw device settings, as written in the simulator config file.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceSettings {
    pub name: Option<String>,
    /// Broker topic filter to subscribe to
    pub subscription_topic: Option<String>,
    pub publish_topic: Option<String>,
    /// JSON template of the published payload, may contain placeholders
    pub publish_payload: Option<String>,
    /// Exact topic an incoming message must arrive on
    pub topic_condition: Option<String>,
    /// JSON mask an incoming payload must match, may contain placeholders
    pub message_mask: Option<String>,
    pub response_delay_ms: u64,
    /// Require identical key sets and array lengths when matching the mask
    pub strict_match: bool,
    /// Publish the template once right after start (binary only)
    pub publish_on_start: bool,
}

/// Validated, immutable device configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    name: String,
    subscription_topic: Option<String>,
    publish_topic: Option<String>,
    publish_payload_template: Option<Value>,
    subscribe_topic_condition: Option<String>,
    subscribe_message_mask: Option<Value>,
    response_delay: Duration,
    strict_match: bool,
}

impl TryFrom<DeviceSettings> for DeviceConfig {
    type Error = ConfigError;

    fn try_from(settings: DeviceSettings) -> Result<Self, Self::Error> {
        let name = settings
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_DEVICE.to_string());

        let publish_payload_template =
            parse_json_field(&name, "publish_payload", settings.publish_payload.as_deref())?;
        let subscribe_message_mask =
            parse_json_field(&name, "message_mask", settings.message_mask.as_deref())?;

        Ok(Self {
            name,
            subscription_topic: settings.subscription_topic,
            publish_topic: settings.publish_topic,
            publish_payload_template,
            subscribe_topic_condition: settings.topic_condition,
            subscribe_message_mask,
            response_delay: Duration::from_millis(settings.response_delay_ms),
            strict_match: settings.strict_match,
        })
    }
}

fn parse_json_field(
    device: &str,
    field: &'static str,
    text: Option<&str>,
) -> Result<Option<Value>, ConfigError> {
    text.map(|t| {
        serde_json::from_str(t).map_err(|source| ConfigError::InvalidJson {
            device: device.to_string(),
            field,
            source,
        })
    })
    .transpose()
}

impl DeviceConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscription_topic(&self) -> Option<&str> {
        self.subscription_topic.as_deref()
    }

    pub fn publish_topic(&self) -> Option<&str> {
        self.publish_topic.as_deref()
    }

    pub fn publish_payload_template(&self) -> Option<&Value> {
        self.publish_payload_template.as_ref()
    }

    pub fn subscribe_topic_condition(&self) -> Option<&str> {
        self.subscribe_topic_condition.as_deref()
    }

    pub fn subscribe_message_mask(&self) -> Option<&Value> {
        self.subscribe_message_mask.as_ref()
    }

    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    pub fn strict_match(&self) -> bool {
        self.strict_match
    }

    pub fn mode(&self) -> Mode {
        Mode::of(self)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription_topic.is_some() || self.subscribe_topic_condition.is_some()
    }

    pub fn is_publishing(&self) -> bool {
        self.publish_topic.is_some() && self.publish_payload_template.is_some()
    }

    /// Topic filter to subscribe to at the broker.
    ///
    /// Falls back to the topic condition when no explicit subscription topic
    /// is configured.
    pub fn broker_filter(&self) -> Option<&str> {
        self.subscription_topic()
            .or_else(|| self.subscribe_topic_condition())
    }
}
