//! Types for conversation transcripts.

use serde::{Deserialize, Serialize};

/// Author of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the human user.
    User,
    /// Reply produced by the external assistant service.
    Assistant,
}

impl Role {
    /// Wire name of the role, as sent to the assistant service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in a conversation. Immutable once appended; insertion order is
/// the only meaningful order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Turn {
    /// Create a user-authored turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant-authored turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
