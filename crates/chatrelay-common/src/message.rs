use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::ThreadId;

/// Speaker of a conversation turn, using the provider's role vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(Error::Database(format!("unknown role '{other}'"))),
        }
    }
}

/// Token counters reported by the provider for one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A persisted conversation turn. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub thread_id: ThreadId,
    pub role: Role,
    /// Display name of the human participant; empty for system and assistant turns.
    pub author: String,
    pub content: String,
    pub usage: Usage,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a turn before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub thread_id: ThreadId,
    pub role: Role,
    pub author: String,
    pub content: String,
    pub usage: Usage,
}

impl NewMessage {
    pub fn new(thread_id: ThreadId, role: Role, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            role,
            author: String::new(),
            content: content.into(),
            usage: Usage::default(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// A text message received from the chat surface, already stripped of
/// platform-specific detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub thread_id: ThreadId,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    /// Authored by this bot's own account.
    pub from_self: bool,
    /// Authored by any bot account.
    pub from_bot: bool,
    pub timestamp: DateTime<Utc>,
}
