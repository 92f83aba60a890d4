//! Error definitions for the outbound relay

use thiserror::Error;

/// Failures of a viewer-initiated send.
///
/// None of these are fatal to the process; each maps to a user-visible
/// error event on the requesting viewer's connection.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Device identifier or message text was empty
    #[error("Device ID and message are required")]
    EmptyInput,

    /// The broker connector is not in the Connected state
    #[error("MQTT client not connected")]
    ConnectorUnavailable,

    /// The identifier matched no known device
    #[error("Unknown device ID: {0}")]
    UnknownDevice(String),

    /// The broker did not accept the publish
    #[error("Failed to publish message: {0}")]
    PublishFailed(String),
}
