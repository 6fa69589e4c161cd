use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration. Every section and field has a default, so an
/// empty file (or no file) is valid input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub discord: DiscordSection,
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
    pub database: DatabaseConfig,
    pub presence: PresenceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    pub bot_token: Option<String>,
    /// When set, conversation is restricted to this channel.
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// OpenAI-compatible endpoint. Defaults to the public OpenAI API.
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Replay stored history into every request instead of only the current turn.
    pub retain_history: bool,
    pub history_limit: usize,
    pub min_message_chars: usize,
    pub override_token: String,
    pub instruction_command: String,
    pub reset_command: String,
    /// Drop messages from other bot accounts as well as the relay's own.
    pub ignore_bots: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            retain_history: false,
            history_limit: 10,
            min_message_chars: 3,
            override_token: "jp".to_string(),
            instruction_command: "!systemprompt".to_string(),
            reset_command: "!resetdb".to_string(),
            ignore_bots: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database/chats.db"),
        }
    }
}

/// Inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

/// Typing-indicator schedule ranges, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub initial_delay_ms: Bounds<u64>,
    pub pulses: Bounds<u32>,
    pub pause_ms: Bounds<u64>,
    pub max_duration_ms: Bounds<u64>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: Bounds::new(5_000, 9_000),
            pulses: Bounds::new(1, 10),
            pause_ms: Bounds::new(1_000, 2_000),
            max_duration_ms: Bounds::new(5_000, 24_000),
        }
    }
}
