use std::fmt;

use super::config::DeviceConfig;

/// Operating mode, derived from a [`DeviceConfig`] on every evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Nothing to subscribe to, nothing to publish
    Idle,
    /// Publishes on demand only, incoming messages are ignored
    PublishOnly,
    /// Records expected messages, never publishes
    SubscribeOnly,
    /// Answers every expected message with a correlated publication
    RequestResponse,
}

impl Mode {
    pub fn of(config: &DeviceConfig) -> Self {
        match (config.is_subscribed(), config.is_publishing()) {
            (false, false) => Self::Idle,
            (false, true) => Self::PublishOnly,
            (true, false) => Self::SubscribeOnly,
            (true, true) => Self::RequestResponse,
        }
    }

    pub fn subscribes(self) -> bool {
        matches!(self, Self::SubscribeOnly | Self::RequestResponse)
    }

    pub fn publishes(self) -> bool {
        matches!(self, Self::PublishOnly | Self::RequestResponse)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PublishOnly => "publish",
            Self::SubscribeOnly => "subscribe",
            Self::RequestResponse => "subscribe-publish",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSettings;

    fn mode_of(settings: DeviceSettings) -> Mode {
        DeviceConfig::try_from(settings).unwrap().mode()
    }

    #[test]
    fn test_subscribe_only() {
        let mode = mode_of(DeviceSettings {
            subscription_topic: Some("t".into()),
            ..Default::default()
        });
        assert_eq!(mode, Mode::SubscribeOnly);
        assert!(mode.subscribes());
        assert!(!mode.publishes());
    }

    #[test]
    fn test_request_response() {
        let mode = mode_of(DeviceSettings {
            subscription_topic: Some("t".into()),
            publish_topic: Some("out".into()),
            publish_payload: Some("{}".into()),
            ..Default::default()
        });
        assert_eq!(mode, Mode::RequestResponse);
    }

    #[test]
    fn test_publish_only() {
        let mode = mode_of(DeviceSettings {
            publish_topic: Some("out".into()),
            publish_payload: Some("{}".into()),
            ..Default::default()
        });
        assert_eq!(mode, Mode::PublishOnly);
    }

    #[test]
    fn test_idle() {
        assert_eq!(mode_of(DeviceSettings::default()), Mode::Idle);
        // a topic alone is not a publication
        let mode = mode_of(DeviceSettings {
            publish_topic: Some("out".into()),
            ..Default::default()
        });
        assert_eq!(mode, Mode::Idle);
    }

    #[test]
    fn test_topic_condition_counts_as_subscription() {
        let mode = mode_of(DeviceSettings {
            topic_condition: Some("t".into()),
            ..Default::default()
        });
        assert_eq!(mode, Mode::SubscribeOnly);
    }
}
