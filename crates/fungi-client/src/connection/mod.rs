//! Connection management
//!
//! Drives the connection state machine from transport notifications and
//! owns the channel registry.

mod hooks;
mod keepalive;
mod manager;
mod state;

pub use hooks::{ClientHooks, CloseHook, ErrorHook, NotifyHook, TransportErrorHook};
pub use manager::{ClientBuilder, FungiClient};
pub use state::ConnectionState;

pub(crate) use manager::{ClientInner, Session};
