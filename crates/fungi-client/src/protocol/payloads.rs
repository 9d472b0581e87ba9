//! Payload definitions
//!
//! Typed `data` payloads of the control events in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Payload for `fungi:connection_established`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEstablishedPayload {
    /// Unique identifier of this socket, used for private channel auth
    pub socket_id: String,

    /// Seconds of inactivity after which the server drops the client
    pub activity_timeout: u64,
}

impl ConnectionEstablishedPayload {
    /// Interval between keepalive pings for the given latency budget
    ///
    /// Returns `None` when the budget leaves no positive interval.
    #[must_use]
    pub fn keep_alive_interval(&self, latency_secs: u64) -> Option<Duration> {
        self.activity_timeout
            .checked_sub(latency_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Payload naming a channel
///
/// Used by `fungi:unsubscribe`, `fungi:subscription_succeeded` and
/// `fungi:unsubscription_succeeded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPayload {
    pub channel: String,
}

/// Payload for `fungi:subscribe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribePayload {
    /// Name of the channel to subscribe to
    pub channel: String,

    /// Authentication token, only for private channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

/// Payload for `fungi:subscription_error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionErrorPayload {
    pub channel: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload for `fungi:trigger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPayload {
    /// Client event name, prefixed with `client-`
    pub event: String,
    pub channel: String,
    pub data: Value,
}

/// Payload for `fungi:error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Textual description of the error
    pub message: String,

    /// HTTP-style status code (401 for unauthorized, ...)
    pub code: u16,
}
