use std::path::Path;

use chatrelay_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

/// Builds an `AppConfig` from an optional YAML file, `.env` and the process
/// environment, in that order of increasing precedence.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration for the relay.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without requiring credentials. Used by the offline admin commands.
    pub fn load_unvalidated(path: Option<&Path>) -> Result<AppConfig> {
        match dotenvy::dotenv() {
            Ok(env_path) => debug!("loaded environment from {}", env_path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to read .env: {e}"))),
        }

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&raw)?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<AppConfig> {
        if raw.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        serde_yaml::from_str(raw).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }
}

impl AppConfig {
    /// Apply the recognized environment variables, reading them through `lookup`.
    /// Empty values are treated as unset.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("DISCORD_BOT_TOKEN") {
            self.discord.bot_token = Some(token);
        }
        if let Some(channel) = var("DISCORD_CHANNEL_ID") {
            self.discord.channel_id = Some(channel);
        }
        if let Some(key) = var("OPENAI_TOKEN") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(retain) = var("RETAIN_HISTORY") {
            self.conversation.retain_history = retain.trim() == "true";
        }
        if let Some(path) = var("CHATRELAY_DB_PATH") {
            self.database.path = path.into();
        }
    }

    /// Reject configurations the relay cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(Error::Config(
                "discord bot token is required (DISCORD_BOT_TOKEN)".into(),
            ));
        }
        if self.llm.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(Error::Config(
                "provider api key is required (OPENAI_TOKEN)".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::Config("llm model must not be empty".into()));
        }
        Ok(())
    }
}
