//! Transport seam
//!
//! The client never owns a socket directly. It talks to a [`Transport`] and
//! consumes the [`TransportEvent`]s the transport produces. Retry and backoff
//! belong to the transport; [`WebSocketTransport`] opens a single socket.

mod close;
mod websocket;

pub use close::CloseEvent;
pub use websocket::WebSocketTransport;

use std::time::Duration;
use thiserror::Error;

/// Duplex message channel to the Fungi server
pub trait Transport: Send + Sync {
    /// Queue a text frame for delivery
    fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. Further sends fail.
    fn close(&self);

    /// Whether the transport is gone for good
    ///
    /// A closed transport never opens another connection, so the client
    /// lets go of it. Transports that reconnect on their own keep the
    /// default.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Notification produced by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Socket opened; the server has not accepted the connection yet
    Open,
    /// Text frame received
    Message(String),
    /// Socket closed
    Close(CloseEvent),
    /// Transport-level failure; a `Close` may or may not follow
    Error(String),
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport is closed")]
    Closed,

    #[error("No tokio runtime available to drive the transport")]
    NoRuntime,

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
