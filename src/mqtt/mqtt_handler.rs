use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, Outgoing, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::BrokerSettings;
use super::message_manager::DeliveredMessage;
use super::publisher::MqttPublisher;

const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Reconnecting,
}

/// One broker connection: the client half plus its not yet spawned event loop
pub struct MqttHandler {
    client_id: String,
    client: AsyncClient,
    event_loop: EventLoop,
    qos: QoS,
}

impl MqttHandler {
    pub fn new(settings: &BrokerSettings, client_id: String) -> Self {
        let mqtt_options = settings.mqtt_options(&client_id);
        let (client, event_loop) = AsyncClient::new(mqtt_options, settings.request_capacity.max(1));
        info!(
            "Created MQTT client {} for {}:{}",
            client_id, settings.host, settings.port
        );

        MqttHandler {
            client_id,
            client,
            event_loop,
            qos: settings.qos(),
        }
    }

    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher::new(self.client.clone(), self.qos)
    }

    /// Queues a SUBSCRIBE; it goes out once the event loop runs
    pub async fn subscribe(&self, filter: &str) -> Result<(), rumqttc::ClientError> {
        info!("{} subscribing to {}", self.client_id, filter);
        self.client.subscribe(filter, self.qos).await
    }

    /// Spawns the task that drives the connection.
    ///
    /// Incoming PUBLISH packets are forwarded to `deliveries` when given. The
    /// task ends once a DISCONNECT has been sent, or on the first connection
    /// error after `cancel` fired. Before that, errors are logged and the
    /// event loop is polled again, which makes `rumqttc` reconnect.
    pub fn spawn(
        self,
        deliveries: Option<mpsc::Sender<DeliveredMessage>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let MqttHandler {
            client_id,
            mut event_loop,
            ..
        } = self;

        tokio::spawn(async move {
            let mut state = ConnectionState::Disconnected;
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                        state = ConnectionState::Connected;
                        info!("{} connected ({:?})", client_id, ack.code);
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        let Some(sender) = &deliveries else {
                            trace!("{} ignoring publish on {}", client_id, publish.topic);
                            continue;
                        };
                        let payload = match std::str::from_utf8(&publish.payload) {
                            Ok(p) => p,
                            Err(e) => {
                                warn!(
                                    "{} dropping non UTF-8 payload on {}: {}",
                                    client_id, publish.topic, e
                                );
                                continue;
                            }
                        };
                        let message = DeliveredMessage::from_topic(publish.topic.clone(), payload);
                        debug!("{} received {}", client_id, message);
                        if let Err(e) = sender.try_send(message) {
                            warn!("{} failed to hand over delivery: {}", client_id, e);
                        }
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        info!("{} disconnected", client_id);
                        break;
                    }
                    Ok(event) => {
                        trace!("{} event {:?}", client_id, event);
                    }
                    Err(e) => {
                        if cancel.is_cancelled() {
                            debug!("{} connection closed during shutdown: {}", client_id, e);
                            break;
                        }
                        if state == ConnectionState::Connected {
                            state = ConnectionState::Reconnecting;
                        }
                        error!("{} connection error ({:?}): {}", client_id, state, e);
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(RECONNECT_PAUSE) => {}
                        }
                    }
                }
            }
            debug!("{} event loop task finished", client_id);
        })
    }
}
