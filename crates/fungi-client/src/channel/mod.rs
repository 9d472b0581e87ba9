//! Channels
//!
//! A channel is a named topic on the connection. It tracks its own
//! subscription state and the handlers bound to its events.

mod channel;
mod handlers;
mod registry;

pub use channel::{BindOptions, Channel, ChannelKind};
pub use handlers::{CatchAllHandler, EventHandler};

pub(crate) use handlers::HandlerSet;
pub(crate) use registry::ChannelRegistry;

/// Names starting with this prefix require an auth token to subscribe
pub const PRIVATE_CHANNEL_PREFIX: &str = "private-";

/// Client-triggered events must start with this prefix
pub const CLIENT_EVENT_PREFIX: &str = "client-";
