//! Wire dispatcher
//!
//! Decodes an inbound frame and maps it to the action the connection has to
//! perform. The mapping is pure; applying the action is the job of
//! [`FungiClient`](crate::FungiClient).

use crate::protocol::{
    ChannelPayload, ConnectionEstablishedPayload, ErrorPayload, ServerEvent, WireMessage,
};
use serde_json::Value;
use thiserror::Error;

/// Action derived from one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Keepalive reply, nothing to do
    Pong,
    /// Connection accepted by the server
    ConnectionEstablished(ConnectionEstablishedPayload),
    /// Subscribe confirmed: mark subscribed, then fire handlers
    SubscriptionSucceeded { channel: String, data: Value },
    /// Unsubscribe confirmed: mark unsubscribed, then fire handlers
    UnsubscriptionSucceeded { channel: String, data: Value },
    /// Subscribe rejected: fire handlers, keep the channel registered
    SubscriptionError { channel: String, data: Value },
    /// Connection-level error, routed to the error hook
    Error(ErrorPayload),
    /// Application event on a channel
    Triggered {
        channel: String,
        event: String,
        data: Value,
    },
}

impl Dispatch {
    /// Event name handlers are matched against, if the action fires any
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::SubscriptionSucceeded { .. } => Some(ServerEvent::SubscriptionSucceeded.as_str()),
            Self::UnsubscriptionSucceeded { .. } => {
                Some(ServerEvent::UnsubscriptionSucceeded.as_str())
            }
            Self::SubscriptionError { .. } => Some(ServerEvent::SubscriptionError.as_str()),
            Self::Triggered { event, .. } => Some(event),
            Self::Pong | Self::ConnectionEstablished(_) | Self::Error(_) => None,
        }
    }
}

/// Reasons an inbound frame cannot be dispatched
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame is not a JSON envelope
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Control event with a payload of the wrong shape
    #[error("Invalid {event} payload: {source}")]
    InvalidPayload {
        event: ServerEvent,
        #[source]
        source: serde_json::Error,
    },

    /// Application event without a channel field
    #[error("Event '{0}' does not name a channel")]
    MissingChannel(String),
}

/// Decode a raw frame and route it
pub fn route(raw: &str) -> Result<Dispatch, DecodeError> {
    if WireMessage::is_pong(raw) {
        return Ok(Dispatch::Pong);
    }

    route_message(WireMessage::from_json(raw)?)
}

/// Route an already decoded message
pub fn route_message(message: WireMessage) -> Result<Dispatch, DecodeError> {
    let Some(server_event) = message.server_event() else {
        let WireMessage {
            event,
            channel,
            data,
        } = message;
        let channel = channel.ok_or_else(|| DecodeError::MissingChannel(event.clone()))?;
        return Ok(Dispatch::Triggered {
            channel,
            event,
            data,
        });
    };

    let invalid = |source| DecodeError::InvalidPayload {
        event: server_event,
        source,
    };

    let dispatch = match server_event {
        ServerEvent::Pong => Dispatch::Pong,
        ServerEvent::ConnectionEstablished => {
            Dispatch::ConnectionEstablished(message.decode_data().map_err(invalid)?)
        }
        ServerEvent::Error => Dispatch::Error(message.decode_data().map_err(invalid)?),
        ServerEvent::SubscriptionSucceeded => {
            let ChannelPayload { channel } = message.decode_data().map_err(invalid)?;
            Dispatch::SubscriptionSucceeded {
                channel,
                data: message.data,
            }
        }
        ServerEvent::UnsubscriptionSucceeded => {
            let ChannelPayload { channel } = message.decode_data().map_err(invalid)?;
            Dispatch::UnsubscriptionSucceeded {
                channel,
                data: message.data,
            }
        }
        ServerEvent::SubscriptionError => {
            let ChannelPayload { channel } = message.decode_data().map_err(invalid)?;
            Dispatch::SubscriptionError {
                channel,
                data: message.data,
            }
        }
    };

    Ok(dispatch)
}
