use crate::mqtt::TransportError;

/// Errors of the device handle and the correlation gate
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The publish template still contains placeholders; without a triggering
    /// message there is nothing to fill them with
    #[error("Publication template of {0} is parametrized and cannot be published on demand")]
    UnresolvedTemplate(String),

    /// No publish topic or payload configured
    #[error("Device {0} has no publication configured")]
    NothingToPublish(String),

    /// The transport refused the publication. Not retried.
    #[error("Publication failed: {0}")]
    PublicationFailed(#[from] TransportError),

    #[error("Device has not been configured")]
    NotConfigured,

    /// Neither subscription nor publication configured
    #[error("Device {0} is idle, nothing to simulate")]
    IdleDevice(String),

    #[error("Device {0} is not running")]
    NotRunning(String),

    #[error("Device {0} is running, stop it first")]
    AlreadyRunning(String),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
