use color_eyre::{eyre::eyre, Result};
use iotsim::config::{resolve_config_path, SimulatorConfig};
use iotsim::device::{DeviceConfig, IoTDevice};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = resolve_config_path(std::env::args().nth(1));
    let config = SimulatorConfig::load(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load {}: {}", config_path.display(), e))?;

    if config.devices.is_empty() {
        warn!("No devices configured in {}", config_path.display());
        return Ok(());
    }

    let mut devices = Vec::with_capacity(config.devices.len());
    for settings in config.devices {
        let publish_on_start = settings.publish_on_start;
        let device_config = DeviceConfig::try_from(settings)?;
        let mut device = IoTDevice::with_config(config.broker.clone(), device_config);

        device.start().await?;
        if publish_on_start {
            if let Err(e) = device.publish_on_demand() {
                error!("Initial publication failed: {}", e);
            }
        }
        devices.push(device);
    }

    info!("{} device(s) running, press Ctrl-C to stop", devices.len());
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;

    info!("Stopping devices");
    for device in &mut devices {
        device.stop().await;
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
