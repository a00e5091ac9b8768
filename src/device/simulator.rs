//! IoT device handle - unified API for one simulated device
//!
//! Owns the device configuration, the observed-trigger latch and, while
//! running, the [`DeviceRuntime`]. Test code drives a device through this
//! handle only:
//!
//! ```rust,no_run
//! use iotsim::device::{DeviceConfig, DeviceSettings, IoTDevice};
//! use iotsim::mqtt::BrokerSettings;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut device = IoTDevice::new(BrokerSettings::default());
//! device.configure(DeviceConfig::try_from(DeviceSettings {
//!     name: Some("settings-reporter".into()),
//!     topic_condition: Some("tc/flat/settings/report".into()),
//!     message_mask: Some(r#"{"id": 2, "state": "running"}"#.into()),
//!     ..Default::default()
//! })?)?;
//!
//! device.start().await?;
//! // ... let the application under test publish ...
//! assert!(device.has_observed_expected_message());
//! device.stop().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use super::config::DeviceConfig;
use super::error::DeviceError;
use super::gate::CorrelationGate;
use super::latch::Latch;
use super::mode::Mode;
use super::runtime::{DeviceRuntime, Running};
use crate::mqtt::BrokerSettings;

pub struct IoTDevice {
    broker: BrokerSettings,
    latch: Arc<Latch>,
    gate: Option<Arc<CorrelationGate>>,
    runtime: Option<DeviceRuntime<Running>>,
}

impl IoTDevice {
    pub fn new(broker: BrokerSettings) -> Self {
        Self {
            broker,
            latch: Arc::new(Latch::new()),
            gate: None,
            runtime: None,
        }
    }

    pub fn with_config(broker: BrokerSettings, config: DeviceConfig) -> Self {
        let mut device = Self::new(broker);
        device.install(config);
        device
    }

    /// Replaces the configuration. Refused while running.
    pub fn configure(&mut self, config: DeviceConfig) -> Result<(), DeviceError> {
        if self.runtime.is_some() {
            return Err(DeviceError::AlreadyRunning(config.name().to_string()));
        }
        self.install(config);
        Ok(())
    }

    fn install(&mut self, config: DeviceConfig) {
        info!("Configured device {} in {} mode", config.name(), config.mode());
        self.gate = Some(Arc::new(CorrelationGate::new(
            Arc::new(config),
            self.latch.clone(),
        )));
    }

    pub fn config(&self) -> Option<&DeviceConfig> {
        self.gate.as_deref().map(CorrelationGate::config)
    }

    pub fn name(&self) -> Option<&str> {
        self.config().map(DeviceConfig::name)
    }

    /// [`Mode::Idle`] while unconfigured
    pub fn mode(&self) -> Mode {
        self.config().map_or(Mode::Idle, DeviceConfig::mode)
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Connects and starts listening and/or publishing.
    ///
    /// Starting a running device only logs a warning. The latch is cleared on
    /// every start.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NotConfigured`], [`DeviceError::IdleDevice`], or a client
    /// error while queueing the subscription.
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        let gate = self.gate.clone().ok_or(DeviceError::NotConfigured)?;
        let name = gate.config().name().to_string();
        if self.runtime.is_some() {
            warn!("IoT device {} is already running, starting is redundant", name);
            return Ok(());
        }

        let mode = gate.mode();
        if mode == Mode::Idle {
            return Err(DeviceError::IdleDevice(name));
        }

        self.latch.reset();
        let runtime = DeviceRuntime::create(gate, self.broker.clone())
            .connect()
            .await?;
        self.runtime = Some(runtime);
        info!("Started IoT device {} simulation in {} mode", name, mode);
        Ok(())
    }

    /// Stops future deliveries and disconnects. A response delay already in
    /// progress runs to completion first.
    pub async fn stop(&mut self) {
        match self.runtime.take() {
            Some(runtime) => {
                runtime.shutdown().await;
            }
            None => info!("IoT device is not running so it can't be stopped"),
        }
    }

    /// Stops the device and forgets its configuration.
    pub async fn close(&mut self) {
        self.stop().await;
        self.gate = None;
        self.latch.reset();
    }

    /// Publishes the configured template once.
    ///
    /// # Errors
    ///
    /// [`DeviceError::UnresolvedTemplate`] for a parametrized template,
    /// [`DeviceError::NothingToPublish`] without publication,
    /// [`DeviceError::NotRunning`] before `start`, and
    /// [`DeviceError::PublicationFailed`] if the client refuses.
    pub fn publish_on_demand(&self) -> Result<(), DeviceError> {
        let gate = self.gate.as_ref().ok_or(DeviceError::NotConfigured)?;
        gate.on_demand_publication()?;
        match &self.runtime {
            Some(runtime) => runtime.publish_on_demand(),
            None => Err(DeviceError::NotRunning(gate.config().name().to_string())),
        }
    }

    /// Starts, publishes the template once and closes the device.
    pub async fn publish_once(&mut self) -> Result<(), DeviceError> {
        self.start().await?;
        let result = self.publish_on_demand();
        self.close().await;
        result
    }

    /// True once per expected message observed since the last call.
    pub fn has_observed_expected_message(&self) -> bool {
        if !self.mode().subscribes() {
            warn!("Device is not subscribed to any topic");
            return false;
        }
        self.latch.consume()
    }
}

impl Drop for IoTDevice {
    fn drop(&mut self) {
        if let Some(runtime) = &self.runtime {
            warn!("Device {} dropped while running, aborting its tasks", runtime.name());
            runtime.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSettings;

    fn unreachable_broker() -> BrokerSettings {
        BrokerSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        }
    }

    fn config(settings: DeviceSettings) -> DeviceConfig {
        DeviceConfig::try_from(settings).unwrap()
    }

    fn publisher_settings(payload: &str) -> DeviceSettings {
        DeviceSettings {
            name: Some("reporter".into()),
            publish_topic: Some("tc/flat/settings/report".into()),
            publish_payload: Some(payload.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_requires_configuration() {
        let mut device = IoTDevice::new(unreachable_broker());
        assert_eq!(device.mode(), Mode::Idle);
        assert!(matches!(device.start().await, Err(DeviceError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_idle_device_refuses_to_start() {
        let mut device = IoTDevice::with_config(unreachable_broker(), config(DeviceSettings::default()));
        assert!(matches!(device.start().await, Err(DeviceError::IdleDevice(_))));
        assert!(!device.is_running());
    }

    #[test]
    fn test_publish_on_demand_checks_template_before_running() {
        let device = IoTDevice::with_config(
            unreachable_broker(),
            config(publisher_settings(r#"{"id": "{id}"}"#)),
        );
        assert!(matches!(
            device.publish_on_demand(),
            Err(DeviceError::UnresolvedTemplate(_))
        ));

        let device = IoTDevice::with_config(
            unreachable_broker(),
            config(publisher_settings(r#"{"id": 2}"#)),
        );
        assert!(matches!(
            device.publish_on_demand(),
            Err(DeviceError::NotRunning(_))
        ));
    }

    #[test]
    fn test_not_subscribed_never_observes() {
        let device = IoTDevice::with_config(
            unreachable_broker(),
            config(publisher_settings(r#"{"id": 2}"#)),
        );
        device.latch.mark();
        assert!(!device.has_observed_expected_message());
    }

    #[test]
    fn test_observed_is_consumed_once() {
        let device = IoTDevice::with_config(
            unreachable_broker(),
            config(DeviceSettings {
                subscription_topic: Some("t".into()),
                ..Default::default()
            }),
        );
        device.latch.mark();
        device.latch.mark();
        assert!(device.has_observed_expected_message());
        assert!(!device.has_observed_expected_message());
    }

    #[tokio::test]
    async fn test_lifecycle_without_broker() {
        let mut device = IoTDevice::with_config(
            unreachable_broker(),
            config(DeviceSettings {
                name: Some("responder".into()),
                subscription_topic: Some("dev/in".into()),
                publish_topic: Some("dev/out".into()),
                publish_payload: Some(r#"{"ok": true}"#.into()),
                ..Default::default()
            }),
        );
        device.latch.mark();

        device.start().await.unwrap();
        assert!(device.is_running());
        assert!(!device.has_observed_expected_message(), "start resets the latch");

        // second start is a no-op
        device.start().await.unwrap();

        let replacement = config(publisher_settings("{}"));
        assert!(matches!(
            device.configure(replacement),
            Err(DeviceError::AlreadyRunning(_))
        ));

        // queued on the client, independent of the broker being reachable
        device.publish_on_demand().unwrap();

        device.stop().await;
        assert!(!device.is_running());
        assert_eq!(device.name(), Some("responder"));

        device.close().await;
        assert!(device.config().is_none());
    }

    #[tokio::test]
    async fn test_publish_once_closes_the_device() {
        let mut device = IoTDevice::with_config(
            unreachable_broker(),
            config(publisher_settings(r#"{"id": 2, "state": "running"}"#)),
        );
        assert_eq!(device.mode(), Mode::PublishOnly);

        device.publish_once().await.unwrap();
        assert!(!device.is_running());
        assert!(device.config().is_none());
    }

    #[tokio::test]
    async fn test_publish_once_with_parametrized_template_still_closes() {
        let mut device = IoTDevice::with_config(
            unreachable_broker(),
            config(publisher_settings(r#"{"id": "{id}"}"#)),
        );

        assert!(matches!(
            device.publish_once().await,
            Err(DeviceError::UnresolvedTemplate(_))
        ));
        assert!(!device.is_running());
        assert!(device.config().is_none());
    }

    #[tokio::test]
    async fn test_publish_once_on_idle_device_fails_at_start() {
        let mut device = IoTDevice::with_config(unreachable_broker(), config(DeviceSettings::default()));
        device.latch.mark();

        assert!(matches!(
            device.publish_once().await,
            Err(DeviceError::IdleDevice(_))
        ));
        assert!(!device.is_running());
        // start bailed out before resetting the latch
        assert!(device.latch.consume());
        assert!(device.config().is_some());
    }
}
