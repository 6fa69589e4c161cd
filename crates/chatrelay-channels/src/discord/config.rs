use chatrelay_common::{Error, Result};
use serenity::all::GatewayIntents;

/// Discord-specific connection settings.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token for authenticating with Discord.
    pub bot_token: String,

    /// Gateway intents to request from Discord.
    pub intents: GatewayIntents,
}

impl DiscordConfig {
    pub fn new(bot_token: &str) -> Result<Self> {
        let bot_token = bot_token.trim();
        if bot_token.is_empty() {
            return Err(Error::Config("discord bot_token is required".into()));
        }

        // GUILD_MESSAGES + MESSAGE_CONTENT: read server channel messages
        // DIRECT_MESSAGES: read DMs
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        Ok(Self {
            bot_token: bot_token.to_string(),
            intents,
        })
    }
}
