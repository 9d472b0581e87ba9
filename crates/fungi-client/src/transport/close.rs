//! Close notifications

use serde::{Deserialize, Serialize};
use std::fmt;

/// Details of a closed connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseEvent {
    /// WebSocket close code
    pub code: u16,
    pub reason: String,
    /// Whether the closing handshake completed
    pub was_clean: bool,
}

impl CloseEvent {
    /// Normal closure
    pub const NORMAL: u16 = 1000;

    /// Connection dropped without a close frame
    pub const ABNORMAL: u16 = 1006;

    /// Closed on purpose by this client
    #[must_use]
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::NORMAL,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// Lost without a closing handshake
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.reason)
        }
    }
}
