//! # MQTT Broker Integration Module
//!
//! Manages the bridge's single broker connection: connect and subscribe at
//! startup, decode inbound mesh traffic into journal entries, publish
//! outbound text, and shut the connection down cleanly.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── connector.rs - Connection state machine, event loop task, publish
//! └── decoder.rs   - Inbound payload classification
//! ```
//!
//! ## Connection Lifecycle
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected ──► Disconnected
//!                      │                          (loss or stop)
//!                      └────────► Failed
//!                        (handshake rejected)
//! ```
//!
//! There is no automatic reconnect: after a connection loss the event-loop
//! task reports the disconnect and exits, and an operator restart is the
//! retry path. `Failed` is terminal for the same reason.
//!
//! The connector never calls into viewer transport code; everything it
//! learns lands in the [`MessageLog`](crate::journal::MessageLog) and fans
//! out from there.

pub mod connector;
pub mod decoder;

pub use connector::{ConnectError, ConnectionState, MeshPublisher, MqttConnector, MqttHandle, PublishError};
pub use decoder::InboundPayload;
