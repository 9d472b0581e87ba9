//! # fungi-client
//!
//! Client engine for the Fungi realtime service: one logical connection,
//! per-channel subscription lifecycles (including authenticated private
//! channels) and routing of server events to registered handlers.

pub mod auth;
pub mod channel;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod transport;

pub use auth::{AuthError, AuthRequest, AuthResponse, Authorizer, HttpAuthorizer};
pub use channel::{BindOptions, Channel, ChannelKind, CLIENT_EVENT_PREFIX, PRIVATE_CHANNEL_PREFIX};
pub use connection::{ClientBuilder, ClientHooks, ConnectionState, FungiClient};
pub use error::{ClientError, TriggerError};
pub use fungi_common::{AuthConfig, ClientConfig, ConfigError};
pub use protocol::{ClientEvent, ServerEvent, WireMessage};
pub use transport::{CloseEvent, Transport, TransportError, TransportEvent, WebSocketTransport};
