pub mod config;
pub mod devices;
pub mod gateway;
pub mod journal;
pub mod mqtt;
pub mod relay;

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::BridgeConfig;
use crate::devices::DeviceDirectory;
use crate::gateway::GatewayState;
use crate::journal::MessageLog;
use crate::mqtt::{MeshPublisher, MqttConnector};
use crate::relay::Relay;

/// Rolling journal capacity
const MAX_LOG_SIZE: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = BridgeConfig::from_env()?;
    info!("Starting Meshtastic MQTT bridge");
    info!(
        "Connecting to MQTT broker: {}:{}",
        config.mqtt_broker, config.mqtt_port
    );
    info!("Root topic: {}", config.root_topic);
    if config.secret_key == "meshtastic-mqtt-secret-change-in-production" {
        warn!("SECRET_KEY is the built-in default; set it in production");
    }

    let log = Arc::new(MessageLog::new(MAX_LOG_SIZE));
    let directory = Arc::new(DeviceDirectory::known_devices());
    info!("Available devices: {:?}", directory.records());

    // Broker unreachable at startup is fatal for the binary; the connector
    // itself reports the failure as a journal entry either way.
    let handle = Arc::new(
        MqttConnector::start(&config, log.clone())
            .await
            .map_err(|e| eyre!("Failed to setup MQTT connection: {e}"))?,
    );

    let relay = Arc::new(Relay::new(
        handle.clone() as Arc<dyn MeshPublisher>,
        directory,
        log.clone(),
        config.root_topic.clone(),
    ));

    let state = Arc::new(GatewayState {
        log,
        relay,
        connection: handle.state_receiver(),
    });

    let bind_addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| eyre!("Failed to bind {bind_addr}: {e}"))?;
    info!("Web interface available at: http://{}", bind_addr);

    axum::serve(listener, gateway::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    handle.stop().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
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
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
