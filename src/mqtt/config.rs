use rumqttc::{MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker connection settings shared by every simulated device
///
/// Each device opens its own client, so the client id is derived per device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    /// Base client id; devices append their name. Random when absent.
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// Capacity of the request queue between client and event loop
    pub request_capacity: usize,
    /// 0, 1 or 2; anything else falls back to 1
    pub qos: u8,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: None,
            username: None,
            password: None,
            keep_alive_secs: 5,
            request_capacity: 100,
            qos: 1,
        }
    }
}

impl BrokerSettings {
    pub fn client_id_for(&self, device_name: &str) -> String {
        match &self.client_id {
            Some(base) => format!("{base}-{device_name}"),
            None => format!("iotsim-{}", uuid::Uuid::new_v4().simple()),
        }
    }

    pub fn qos(&self) -> QoS {
        match self.qos {
            0 => QoS::AtMostOnce,
            2 => QoS::ExactlyOnce,
            _ => QoS::AtLeastOnce,
        }
    }

    pub fn mqtt_options(&self, client_id: &str) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(client_id, self.host.clone(), self.port);
        mqtt_options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(1)));
        if let Some(user) = &self.username {
            mqtt_options.set_credentials(user.clone(), self.password.clone().unwrap_or_default());
        }
        mqtt_options
    }
}
