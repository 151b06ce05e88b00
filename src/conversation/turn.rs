//! Turn model for conversation transcripts.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// System instruction.
    System,
}

impl Role {
    /// Stable string form for storage and the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single message in a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// ISO-8601 creation time.
    pub timestamp: String,
}

impl Turn {
    /// Build a turn stamped with the current local time.
    #[must_use]
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
impl Turn {
    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self::now(Role::User, content)
    }

    pub(crate) fn assistant(content: impl Into<String>) -> Self {
        Self::now(Role::Assistant, content)
    }
}
