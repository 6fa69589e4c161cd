use std::sync::OnceLock;

use serenity::all::{self as serenity_model, Context, EventHandler, Message as SerenityMessage, Ready, UserId};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::traits::{ChannelEvent, ChannelStatus};

use super::convert;

/// Serenity event handler that bridges Discord events into `ChannelEvent`s.
pub struct DiscordHandler {
    /// Broadcast sender for emitting channel events to subscribers.
    event_tx: broadcast::Sender<ChannelEvent>,

    /// Set once the gateway reports ready.
    bot_id: OnceLock<UserId>,
}

impl DiscordHandler {
    pub fn new(event_tx: broadcast::Sender<ChannelEvent>) -> Self {
        Self {
            event_tx,
            bot_id: OnceLock::new(),
        }
    }

    fn emit(&self, event: ChannelEvent) {
        if let Err(e) = self.event_tx.send(event) {
            warn!("no subscribers for channel event: {e}");
        }
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {} (guilds: {})",
            ready.user.name,
            ready.guilds.len()
        );
        let _ = self.bot_id.set(ready.user.id);
        self.emit(ChannelEvent::StatusChanged(ChannelStatus::Connected));
    }

    async fn resume(&self, _ctx: Context, _: serenity_model::ResumedEvent) {
        info!("Discord gateway connection resumed");
        self.emit(ChannelEvent::StatusChanged(ChannelStatus::Connected));
    }

    /// Fired when a message is received in any channel the bot can see.
    /// Self and bot filtering happens downstream.
    async fn message(&self, _ctx: Context, msg: SerenityMessage) {
        let inbound = convert::discord_message_to_inbound(&msg, self.bot_id.get().copied());

        tracing::debug!(
            message_id = %msg.id,
            author = %msg.author.name,
            channel = %msg.channel_id,
            "received discord message"
        );

        self.emit(ChannelEvent::MessageReceived(inbound));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_starts_without_bot_id() {
        let (tx, _rx) = broadcast::channel::<ChannelEvent>(16);
        let handler = DiscordHandler::new(tx);
        assert!(handler.bot_id.get().is_none());
    }

    #[test]
    fn emit_with_no_subscribers_does_not_panic() {
        let (tx, _) = broadcast::channel::<ChannelEvent>(16);
        let handler = DiscordHandler::new(tx);
        handler.emit(ChannelEvent::StatusChanged(ChannelStatus::Connected));
    }

    #[tokio::test]
    async fn emit_reaches_subscribers() {
        let (tx, mut rx) = broadcast::channel::<ChannelEvent>(16);
        let handler = DiscordHandler::new(tx);
        handler.emit(ChannelEvent::Error("boom".into()));
        assert!(matches!(rx.recv().await, Ok(ChannelEvent::Error(e)) if e == "boom"));
    }
}
