//! Client error types

use crate::auth::AuthError;
use crate::transport::TransportError;
use fungi_common::ConfigError;
use thiserror::Error;

/// Errors returned by connection-level operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration rejected at construction
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The auth handshake could not be set up
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// No transport is attached (deferred or disconnected client)
    #[error("Not connected")]
    NotConnected,

    /// The transport refused the frame
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Outbound data could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons a client event trigger is rejected
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(
        "Failed to trigger client event with an event name of {event} on channel {channel}. Client events can only be triggered after a subscription has been successfully registered."
    )]
    NotSubscribed { channel: String, event: String },

    #[error(
        "Failed to trigger client event with an event name of {event} on channel {channel}. Client events can only be triggered on authenticated channels."
    )]
    NotPrivate { channel: String, event: String },

    #[error(
        "Failed to trigger client event with an event name of {event} on channel {channel}. The event name for client events must be prefixed with 'client-'."
    )]
    InvalidEventName { channel: String, event: String },

    #[error("Failed to send client event: {0}")]
    Send(#[from] ClientError),
}

impl TriggerError {
    /// Whether the caller misused the API, as opposed to a send failure
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        !matches!(self, Self::Send(_))
    }
}
