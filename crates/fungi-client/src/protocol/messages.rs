//! Wire message format
//!
//! Defines the structure of every JSON envelope on the connection.

use super::{
    ChannelPayload, ClientEvent, ServerEvent, SubscribePayload, TriggerPayload, PONG,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire message format
///
/// Control messages are `{event, data}`. Application events triggered on a
/// channel also carry the channel name: `{event, channel, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Event tag
    pub event: String,

    /// Channel name (only for triggered application events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Event data payload
    #[serde(default)]
    pub data: Value,
}

impl WireMessage {
    /// Create an envelope with no channel field
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            channel: None,
            data,
        }
    }

    // === Client Messages ===

    /// Create a subscribe request, with the auth token for private channels
    #[must_use]
    pub fn subscribe(channel: &str, auth: Option<String>) -> Self {
        Self::client(
            ClientEvent::Subscribe,
            &SubscribePayload {
                channel: channel.to_string(),
                auth,
            },
        )
    }

    /// Create an unsubscribe request
    #[must_use]
    pub fn unsubscribe(channel: &str) -> Self {
        Self::client(
            ClientEvent::Unsubscribe,
            &ChannelPayload {
                channel: channel.to_string(),
            },
        )
    }

    /// Create a client event trigger
    #[must_use]
    pub fn trigger(channel: &str, event: &str, data: Value) -> Self {
        Self::client(
            ClientEvent::Trigger,
            &TriggerPayload {
                event: event.to_string(),
                channel: channel.to_string(),
                data,
            },
        )
    }

    fn client<T: Serialize>(event: ClientEvent, payload: &T) -> Self {
        // Payload structs only hold strings and JSON values
        Self::new(
            event.as_str(),
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    // === Parsing Server Messages ===

    /// Control event this message carries, `None` for application events
    #[must_use]
    pub fn server_event(&self) -> Option<ServerEvent> {
        ServerEvent::from_tag(&self.event)
    }

    /// Decode the data payload into a typed structure
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }

    /// Check whether a raw frame is the bare keepalive reply
    #[must_use]
    pub fn is_pong(raw: &str) -> bool {
        raw.trim() == PONG
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for WireMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "WireMessage(event={}, channel={channel})", self.event),
            None => write!(f, "WireMessage(event={})", self.event),
        }
    }
}
