//! # Outbound Relay Module
//!
//! Turns a viewer's send request into a broker publish: resolve the device,
//! build the Meshtastic JSON downlink, publish it, and echo the result into
//! the journal. The echo is optimistic: a successful publish means the
//! broker took the message, not that the mesh delivered it.

pub mod error;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::devices::DeviceDirectory;
use crate::journal::{EntryKind, MessageLog};
use crate::mqtt::{ConnectionState, MeshPublisher};

pub use error::RelayError;

/// Downlink body a Meshtastic gateway accepts on the `json/mqtt` subtopic
#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    payload: &'a str,
}

/// Relays viewer-composed text onto the mesh
pub struct Relay {
    publisher: Arc<dyn MeshPublisher>,
    directory: Arc<DeviceDirectory>,
    log: Arc<MessageLog>,
    root_topic: String,
}

impl Relay {
    pub fn new(
        publisher: Arc<dyn MeshPublisher>,
        directory: Arc<DeviceDirectory>,
        log: Arc<MessageLog>,
        root_topic: String,
    ) -> Self {
        Self {
            publisher,
            directory,
            log,
            root_topic,
        }
    }

    /// Sends `text` to the device named by `device_id`.
    ///
    /// The identifier may be a short id or the decimal form of a numeric
    /// mesh address. On a successful publish a `Sent` entry is appended;
    /// on any failure nothing is appended and the error describes what a
    /// viewer should see.
    pub async fn send(&self, device_id: &str, text: &str) -> Result<(), RelayError> {
        if device_id.is_empty() || text.is_empty() {
            return Err(RelayError::EmptyInput);
        }

        if self.publisher.state() != ConnectionState::Connected {
            return Err(RelayError::ConnectorUnavailable);
        }

        let record = self
            .directory
            .resolve(device_id)
            .ok_or_else(|| RelayError::UnknownDevice(device_id.to_string()))?;

        let topic = format!("{}/2/json/mqtt/!{}", self.root_topic, record.short_id);
        let body = serde_json::to_string(&OutboundMessage {
            from: record.numeric_address,
            kind: "sendtext",
            payload: text,
        })
        .map_err(|e| RelayError::PublishFailed(e.to_string()))?;

        debug!("Publishing to {}: {}", topic, body);

        self.publisher
            .publish(&topic, &body)
            .await
            .map_err(|e| RelayError::PublishFailed(e.0))?;

        info!(
            "Relayed text as {} ({})",
            record.short_id, record.numeric_address
        );
        self.log.append(
            EntryKind::Sent,
            format!(
                "Sent as {} ({}): {}",
                record.short_id, record.numeric_address, text
            ),
            topic,
            body,
        );
        Ok(())
    }
}
