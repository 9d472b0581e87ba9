//! Connection state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No open socket
    #[default]
    Disconnected,
    /// Socket open, waiting for the server to accept the connection
    Connecting,
    /// Server accepted the connection and assigned a socket id
    Established,
}

impl ConnectionState {
    #[must_use]
    pub fn is_established(self) -> bool {
        self == Self::Established
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Established => "established",
        };
        f.write_str(name)
    }
}
