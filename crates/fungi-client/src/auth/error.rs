//! Auth handshake errors

use thiserror::Error;

/// Reasons an auth handshake fails
#[derive(Debug, Error)]
pub enum AuthError {
    /// No auth endpoint configured, private channels cannot be used
    #[error("No auth endpoint configured; private channels require one")]
    MissingEndpoint,

    /// The connection has no socket id yet
    #[error("Cannot authorize before the connection is established")]
    NotConnected,

    /// Request failed or timed out
    #[error("Auth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Auth endpoint {endpoint} answered with status {status}")]
    Status { status: u16, endpoint: String },

    /// Body is not the expected JSON
    #[error("Invalid auth response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Body has no usable `auth` field
    #[error("Auth response does not contain a token")]
    MissingToken,
}

impl AuthError {
    /// Whether the failure comes from configuration rather than the network
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingEndpoint)
    }
}
