//! Conversation log items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// What an item records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
    /// Visible dialogue; the only kind forwarded to a capability call.
    Message,
    /// Tool call / handoff bookkeeping kept for history only.
    ToolBookkeeping,
}

/// Who produced the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Completion status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Completed,
    InProgress,
    Incomplete,
}

/// One entry of a session's conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationItem {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::message(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::message(Role::Assistant, content)
    }

    /// Create a bookkeeping entry (tool call, handoff marker).
    pub fn bookkeeping(role: Role, content: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            kind: ItemKind::ToolBookkeeping,
            role,
            content: content.into(),
            status,
            timestamp: Some(Utc::now()),
        }
    }

    fn message(role: Role, content: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Message,
            role,
            content: content.into(),
            status: ItemStatus::Completed,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn is_message(&self) -> bool {
        self.kind == ItemKind::Message
    }
}
