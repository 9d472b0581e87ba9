//! Wire protocol definitions
//!
//! Defines the JSON envelope exchanged with the Fungi server, the event tags
//! it carries, and the typed payloads of the control events.

mod events;
mod messages;
mod payloads;

pub use events::{ClientEvent, ServerEvent, PING, PONG};
pub use messages::WireMessage;
pub use payloads::{
    ChannelPayload, ConnectionEstablishedPayload, ErrorPayload, SubscribePayload,
    SubscriptionErrorPayload, TriggerPayload,
};
