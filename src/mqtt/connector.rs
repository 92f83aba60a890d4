//! Broker connection state machine and event-loop task.
//!
//! [`MqttConnector::start`] drives the handshake to completion before
//! returning, so a caller knows synchronously whether the broker is
//! reachable. After a successful handshake the event loop moves onto its
//! own task and every inbound publish is decoded and appended to the
//! journal. A connection loss is reported and the task exits; there is no
//! automatic reconnect.

use std::str;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::journal::{EntryKind, MessageLog};

use super::decoder::InboundPayload;

/// Broker keep-alive interval. Fixed; there are no other operation-level
/// timeouts on the connection.
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Client id presented to the broker
const CLIENT_ID: &str = "meshbridge";

/// Request queue depth between client handle and event loop
const CLIENT_CHANNEL_CAPACITY: usize = 100;

/// Lifecycle state of the broker connection
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Errors raised while establishing the broker connection
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The broker was unreachable or the transport failed mid-handshake
    #[error("Failed to connect to MQTT broker: {0}")]
    Handshake(String),

    /// The broker answered the handshake with a refusal code
    #[error("MQTT broker refused connection: {0}")]
    Refused(String),

    /// The subscription request could not be issued
    #[error("Failed to subscribe: {0}")]
    Subscribe(String),

    /// The connect attempt was cancelled before the broker answered
    #[error("Connect attempt cancelled")]
    Cancelled,
}

/// A publish forwarded to the broker was not accepted
#[derive(Debug, Error)]
#[error("Failed to publish message: {0}")]
pub struct PublishError(pub String);

/// The seam the outbound relay publishes through.
///
/// [`MqttHandle`] is the production implementation; tests substitute a fake
/// that records calls and simulates failure.
#[async_trait]
pub trait MeshPublisher: Send + Sync {
    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Forwards one payload to the broker.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

/// Handle to a live broker connection.
///
/// Cheap to share behind an [`Arc`]; dropping it does not stop the event
/// loop, [`stop`](Self::stop) does.
#[derive(Debug)]
pub struct MqttHandle {
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl MqttHandle {
    /// Watch channel following the connection state, for health reporting.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Releases the connection.
    ///
    /// Unblocks any in-progress poll and waits for the event-loop task to
    /// report the disconnect, leaving the state machine in `Disconnected`.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let mut rx = self.state_rx.clone();
        while *rx.borrow() != ConnectionState::Disconnected {
            if rx.changed().await.is_err() {
                warn!("Event loop ended without reporting disconnect");
                break;
            }
        }
    }
}

#[async_trait]
impl MeshPublisher for MqttHandle {
    fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(|e| PublishError(e.to_string()))
    }
}

/// Factory for broker connections
pub struct MqttConnector;

impl MqttConnector {
    /// Connects to the broker and subscribes to `{root_topic}/#`.
    ///
    /// Polls the handshake to completion before returning: on success the
    /// journal gets a `System` entry and the event loop keeps running on a
    /// spawned task; on failure the journal gets an `Error` entry and the
    /// state machine ends in `Failed`. Callers decide whether that is fatal.
    pub async fn start(
        config: &BridgeConfig,
        log: Arc<MessageLog>,
    ) -> Result<MqttHandle, ConnectError> {
        Self::start_with_token(config, log, CancellationToken::new()).await
    }

    /// Like [`start`](Self::start), with a caller-supplied cancellation
    /// token.
    ///
    /// Cancelling the token unblocks an in-progress connect attempt and
    /// leaves the state machine in `Disconnected`; after a successful start
    /// it stops the event loop the same way [`MqttHandle::stop`] does.
    pub async fn start_with_token(
        config: &BridgeConfig,
        log: Arc<MessageLog>,
        cancel: CancellationToken,
    ) -> Result<MqttHandle, ConnectError> {
        let subscribe_topic = config.subscribe_topic();
        info!(
            "Connecting to MQTT broker {}:{}",
            config.mqtt_broker, config.mqtt_port
        );

        let mut options = MqttOptions::new(CLIENT_ID, &config.mqtt_broker, config.mqtt_port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut eventloop) = AsyncClient::new(options, CLIENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        // Drive the event loop by hand until the broker acknowledges the
        // session, so startup failure is observable at the call site.
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    state_tx.send_replace(ConnectionState::Disconnected);
                    return Err(ConnectError::Cancelled);
                }
                event = eventloop.poll() => event,
            };
            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        break;
                    }
                    let reason = format!("{:?}", ack.code);
                    state_tx.send_replace(ConnectionState::Failed);
                    log.append(
                        EntryKind::Error,
                        format!("Failed to connect to MQTT broker. Return code: {reason}"),
                        String::new(),
                        String::new(),
                    );
                    return Err(ConnectError::Refused(reason));
                }
                Ok(event) => {
                    debug!("Pre-handshake event: {:?}", event);
                }
                Err(e) => {
                    state_tx.send_replace(ConnectionState::Failed);
                    log.append(
                        EntryKind::Error,
                        format!("Failed to connect to MQTT broker. Return code: {e}"),
                        String::new(),
                        String::new(),
                    );
                    return Err(ConnectError::Handshake(e.to_string()));
                }
            }
        }

        finish_startup(&client, &subscribe_topic, &log, &state_tx).await?;

        let _event_loop_task = tokio::spawn(run_event_loop(
            eventloop,
            client.clone(),
            log,
            state_tx,
            cancel.clone(),
        ));

        Ok(MqttHandle {
            client,
            state_rx,
            cancel,
        })
    }
}

/// Issues the wildcard subscription after an accepted handshake.
///
/// A subscribe failure ends startup the same way the other handshake-phase
/// errors do: the state machine lands in `Failed` and the journal records
/// the outcome.
async fn finish_startup(
    client: &AsyncClient,
    subscribe_topic: &str,
    log: &MessageLog,
    state_tx: &watch::Sender<ConnectionState>,
) -> Result<(), ConnectError> {
    if let Err(e) = client.subscribe(subscribe_topic, QoS::AtMostOnce).await {
        state_tx.send_replace(ConnectionState::Failed);
        log.append(
            EntryKind::Error,
            format!("Failed to subscribe to {subscribe_topic}: {e}"),
            String::new(),
            String::new(),
        );
        return Err(ConnectError::Subscribe(e.to_string()));
    }

    state_tx.send_replace(ConnectionState::Connected);
    log.append(
        EntryKind::System,
        format!("Connected to MQTT broker and subscribed to {subscribe_topic}"),
        String::new(),
        String::new(),
    );
    Ok(())
}

/// Long-running poll loop for an established connection.
///
/// Exits on cancellation or on the first connection error. No error in the
/// message-handling path terminates the loop.
async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    log: Arc<MessageLog>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = client.disconnect().await {
                    debug!("Disconnect request after cancel failed: {}", e);
                }
                state_tx.send_replace(ConnectionState::Disconnected);
                log.append(
                    EntryKind::System,
                    "Disconnected from MQTT broker".to_string(),
                    String::new(),
                    String::new(),
                );
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handle_publish(&log, &publish.topic, &publish.payload);
                }
                Ok(event) => {
                    debug!("Broker event: {:?}", event);
                }
                Err(e) => {
                    // No automatic reconnect: report the loss and stop
                    // listening. Restarting the process is the retry path.
                    error!("MQTT connection lost: {}", e);
                    state_tx.send_replace(ConnectionState::Disconnected);
                    log.append(
                        EntryKind::System,
                        "Disconnected from MQTT broker".to_string(),
                        String::new(),
                        String::new(),
                    );
                    break;
                }
            }
        }
    }
}

/// Decodes one inbound publish into a journal entry.
fn handle_publish(log: &MessageLog, topic: &str, payload: &[u8]) {
    let raw = match str::from_utf8(payload) {
        Ok(text) => text,
        Err(e) => {
            // Keep processing subsequent messages; this one is recorded as
            // an error with whatever context we have.
            log.append(
                EntryKind::Error,
                format!("Error processing message: {e}"),
                topic.to_string(),
                String::from_utf8_lossy(payload).into_owned(),
            );
            return;
        }
    };

    debug!("Raw MQTT message - Topic: {}, Payload: {}", topic, raw);

    let content = InboundPayload::classify(raw).content();
    log.append(
        EntryKind::Received,
        content,
        topic.to_string(),
        raw.to_string(),
    );
}
