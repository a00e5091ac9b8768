//! Device runtime with statum state machine for the connection lifecycle
//!
//! # State Machine
//!
//! ```text
//! Configured ──connect──► Running ──shutdown──► Stopped
//! ```
//!
//! # Tasks of a running device
//!
//! ```text
//! rumqttc EventLoop ──[DeliveredMessage]──► delivery worker ──► CorrelationGate
//!   (event loop task)     mpsc(100)          (one at a time)        │
//!         ▲                                                         │
//!         └──────────────── AsyncClient::try_publish ◄──────────────┘
//! ```
//!
//! Shutdown cancels the token first. The worker then stops taking deliveries,
//! but a response delay that is already running is not interrupted: the
//! worker finishes that delivery before it exits.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::AsyncClient;
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::DeviceError;
use super::gate::{CorrelationGate, Delivery};
use crate::mqtt::{BrokerSettings, DeliveredMessage, MqttHandler, MqttPublisher};

const DELIVERY_CAPACITY: usize = 100;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// States for the device runtime lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum RuntimeState {
    Configured, // Gate and broker settings known, nothing connected
    Running,    // Client created, tasks spawned
    Stopped,    // Tasks finished, client disconnected
}

#[machine]
pub struct DeviceRuntime<S: RuntimeState> {
    gate: Arc<CorrelationGate>,
    broker: BrokerSettings,
    client: Option<AsyncClient>,
    publisher: Option<MqttPublisher>,
    cancel: CancellationToken,
    event_loop_task: Option<JoinHandle<()>>,
    worker_task: Option<JoinHandle<()>>,
}

impl<S: RuntimeState> DeviceRuntime<S> {
    pub fn name(&self) -> &str {
        self.gate.config().name()
    }
}

impl DeviceRuntime<Configured> {
    pub fn create(gate: Arc<CorrelationGate>, broker: BrokerSettings) -> Self {
        debug!("Creating runtime for device {}", gate.config().name());

        Self::new(
            gate,
            broker,
            None,                     // client
            None,                     // publisher
            CancellationToken::new(), // cancel
            None,                     // event_loop_task
            None,                     // worker_task
        )
    }

    /// Creates the MQTT client, queues the subscription and spawns the tasks.
    ///
    /// The broker connection itself is established by the event loop task;
    /// connection problems show up in its log, not here.
    pub async fn connect(mut self) -> Result<DeviceRuntime<Running>, DeviceError> {
        let gate = self.gate.clone();
        let config = gate.config();
        let handler = MqttHandler::new(&self.broker, self.broker.client_id_for(config.name()));

        let deliveries = match config.broker_filter() {
            Some(filter) if gate.mode().subscribes() => {
                handler.subscribe(filter).await?;
                let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_CAPACITY);
                self.worker_task = Some(spawn_worker(
                    gate.clone(),
                    handler.publisher(),
                    delivery_rx,
                    self.cancel.clone(),
                ));
                Some(delivery_tx)
            }
            _ => None,
        };

        self.client = Some(handler.client());
        self.publisher = Some(handler.publisher());
        info!(
            "Device {} connecting as {}",
            config.name(),
            handler.client_id()
        );
        self.event_loop_task = Some(handler.spawn(deliveries, self.cancel.clone()));

        Ok(self.transition())
    }
}

impl DeviceRuntime<Running> {
    pub fn publish_on_demand(&self) -> Result<(), DeviceError> {
        match &self.publisher {
            Some(publisher) => self.gate.publish_on_demand(publisher),
            None => Err(DeviceError::NotRunning(self.name().to_string())),
        }
    }

    /// Stops the tasks without waiting for them. Used when the owner is
    /// dropped while still running.
    pub fn abort(&self) {
        self.cancel.cancel();
        for task in [&self.worker_task, &self.event_loop_task].into_iter().flatten() {
            task.abort();
        }
    }

    pub async fn shutdown(mut self) -> DeviceRuntime<Stopped> {
        info!("Shutting down device {}", self.name());
        self.cancel.cancel();

        if let Some(worker) = self.worker_task.take() {
            debug!("Waiting for delivery worker of {}", self.name());
            if let Err(e) = worker.await {
                error!("Delivery worker of {} failed: {}", self.name(), e);
            }
        }

        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                warn!("Disconnect request of {} failed: {}", self.name(), e);
            }
        }

        if let Some(mut task) = self.event_loop_task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => debug!("Event loop of {} finished", self.name()),
                Ok(Err(e)) => error!("Event loop of {} failed: {}", self.name(), e),
                Err(_) => {
                    warn!("Event loop of {} did not finish in time, aborting", self.name());
                    task.abort();
                }
            }
        }

        self.publisher = None;
        info!("Device {} stopped", self.name());
        self.transition()
    }
}

impl DeviceRuntime<Stopped> {}

fn spawn_worker(
    gate: Arc<CorrelationGate>,
    publisher: MqttPublisher,
    mut deliveries: mpsc::Receiver<DeliveredMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = gate.config().name().to_string();
        debug!("Delivery worker of {} started", name);
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = deliveries.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            match gate.deliver(&message.topic, &message.payload, &publisher).await {
                Ok(Delivery::Responded { topic, .. }) => {
                    debug!("{} answered message from {} on {}", name, message.topic, topic);
                }
                Ok(delivery) => debug!(
                    "{} handled {} from {}: {:?}",
                    name,
                    message.minimized_payload(),
                    message.topic,
                    delivery
                ),
                Err(e) => error!("{} failed to handle {}: {}", name, message, e),
            }
        }
        debug!("Delivery worker of {} finished", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceConfig, DeviceSettings, Latch};
    use rumqttc::{MqttOptions, QoS};
    use std::time::Instant;

    const RESPONSE_DELAY: Duration = Duration::from_millis(200);

    fn delayed_responder(latch: Arc<Latch>) -> Arc<CorrelationGate> {
        let config = DeviceConfig::try_from(DeviceSettings {
            name: Some("slow-responder".into()),
            subscription_topic: Some("dev/in".into()),
            publish_topic: Some("dev/out".into()),
            publish_payload: Some(r#"{"ok": true}"#.into()),
            response_delay_ms: RESPONSE_DELAY.as_millis() as u64,
            ..DeviceSettings::default()
        })
        .unwrap();
        Arc::new(CorrelationGate::new(Arc::new(config), latch))
    }

    #[tokio::test]
    async fn test_cancel_lets_in_flight_delivery_finish() {
        let latch = Arc::new(Latch::new());
        let gate = delayed_responder(latch.clone());
        // requests only queue up, the event loop is never polled
        let (client, _event_loop) =
            AsyncClient::new(MqttOptions::new("worker-test", "127.0.0.1", 1), 10);
        let publisher = MqttPublisher::new(client, QoS::AtLeastOnce);

        let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_CAPACITY);
        delivery_tx
            .send(DeliveredMessage::from_topic("dev/in", r#"{"n": 1}"#))
            .await
            .unwrap();
        delivery_tx
            .send(DeliveredMessage::from_topic("dev/in", r#"{"n": 2}"#))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let started = Instant::now();
        let worker = spawn_worker(gate, publisher, delivery_rx, cancel.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        assert!(!latch.consume(), "first delivery is still waiting");

        worker.await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= RESPONSE_DELAY, "delay was cut short: {elapsed:?}");
        assert!(
            elapsed < RESPONSE_DELAY * 2,
            "second delivery was processed after cancel: {elapsed:?}"
        );
        assert!(latch.consume());
        assert!(!latch.consume());
    }

    #[tokio::test]
    async fn test_worker_exits_when_deliveries_close() {
        let latch = Arc::new(Latch::new());
        let gate = delayed_responder(latch.clone());
        let (client, _event_loop) =
            AsyncClient::new(MqttOptions::new("worker-test", "127.0.0.1", 1), 10);
        let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_CAPACITY);

        let worker = spawn_worker(
            gate,
            MqttPublisher::new(client, QoS::AtLeastOnce),
            delivery_rx,
            CancellationToken::new(),
        );
        drop(delivery_tx);

        tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .expect("worker did not exit")
            .unwrap();
        assert!(!latch.consume());
    }
}
