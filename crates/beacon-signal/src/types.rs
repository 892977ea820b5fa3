//! Common types for the relay core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a registered connection.
///
/// Short, human-typeable token generated at connection time. Unique
/// among currently-registered connections; may be reused after
/// deregistration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Connection state in the relay session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, welcome envelope not yet delivered
    Connected,
    /// Welcome sent, processing inbound messages
    Active,
    /// Deregistered; terminal
    Closed,
}
