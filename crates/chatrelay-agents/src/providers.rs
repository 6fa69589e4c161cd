use async_trait::async_trait;
use chatrelay_common::{Result, Role, Usage};
use serde::{Deserialize, Serialize};

/// Boundary to a hosted completion provider (OpenAI, or anything speaking its API).
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn provider_id(&self) -> &str;

    /// Submit an ordered message list and wait for the reply choices.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Check if the provider is reachable and the credentials are accepted.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Reply choices in provider order, plus the token usage of the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub choices: Vec<ChatMessage>,
    pub model: String,
    pub usage: Usage,
}
