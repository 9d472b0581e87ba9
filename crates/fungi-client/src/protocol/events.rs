//! Wire event tags
//!
//! Every envelope carries one of these tags in its `event` field. Tags not
//! listed in [`ServerEvent`] are application events triggered on a channel.

use std::fmt;

/// Keepalive frame sent by the client. Sent bare, not as an envelope.
pub const PING: &str = "fungi:ping";

/// Keepalive reply sent by the server. Received bare, not as an envelope.
pub const PONG: &str = "fungi:pong";

/// Events the client sends to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// Subscribe to a channel (`{channel, auth?}`)
    Subscribe,
    /// Unsubscribe from a channel (`{channel}`)
    Unsubscribe,
    /// Trigger a client event on a private channel (`{event, channel, data}`)
    Trigger,
}

impl ClientEvent {
    /// Get the wire tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "fungi:subscribe",
            Self::Unsubscribe => "fungi:unsubscribe",
            Self::Trigger => "fungi:trigger",
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control events the server sends to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerEvent {
    /// Connection accepted, carries the socket id and activity timeout
    ConnectionEstablished,
    /// A subscribe request was accepted
    SubscriptionSucceeded,
    /// A subscribe request was rejected
    SubscriptionError,
    /// An unsubscribe request was accepted
    UnsubscriptionSucceeded,
    /// Connection-level error with a message and an HTTP-style code
    Error,
    /// Reply to a keepalive ping
    Pong,
}

impl ServerEvent {
    /// Parse a wire tag. Returns `None` for application events.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fungi:connection_established" => Some(Self::ConnectionEstablished),
            "fungi:subscription_succeeded" => Some(Self::SubscriptionSucceeded),
            "fungi:subscription_error" => Some(Self::SubscriptionError),
            "fungi:unsubscription_succeeded" => Some(Self::UnsubscriptionSucceeded),
            "fungi:error" => Some(Self::Error),
            PONG => Some(Self::Pong),
            _ => None,
        }
    }

    /// Get the wire tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "fungi:connection_established",
            Self::SubscriptionSucceeded => "fungi:subscription_succeeded",
            Self::SubscriptionError => "fungi:subscription_error",
            Self::UnsubscriptionSucceeded => "fungi:unsubscription_succeeded",
            Self::Error => "fungi:error",
            Self::Pong => PONG,
        }
    }

    /// Whether the event refers to a channel through `data.channel`
    #[must_use]
    pub const fn is_subscription_event(self) -> bool {
        matches!(
            self,
            Self::SubscriptionSucceeded | Self::SubscriptionError | Self::UnsubscriptionSucceeded
        )
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
