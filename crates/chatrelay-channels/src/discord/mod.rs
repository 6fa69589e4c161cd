pub mod config;
pub mod convert;
pub mod handler;
pub mod sender;

use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_common::{Error, Result};
use serenity::all::{Client, Http, ShardManager};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::traits::{ChannelEvent, ChannelLifecycle, ChannelStatus, ChatSurface};

pub use config::DiscordConfig;
pub use handler::DiscordHandler;
pub use sender::{DiscordSender, MAX_MESSAGE_CHARS};

const EVENT_BUFFER: usize = 256;

/// Discord bot connection driven by a serenity gateway client.
pub struct DiscordChannel {
    config: DiscordConfig,
    display: String,
    status: ChannelStatus,
    event_tx: broadcast::Sender<ChannelEvent>,
    http: Option<Arc<Http>>,
    shard_manager: Option<Arc<ShardManager>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            display: "Discord".to_string(),
            status: ChannelStatus::Disconnected,
            event_tx,
            http: None,
            shard_manager: None,
        }
    }
}

#[async_trait]
impl ChannelLifecycle for DiscordChannel {
    fn display_name(&self) -> &str {
        &self.display
    }

    async fn connect(&mut self) -> Result<()> {
        self.status = ChannelStatus::Connecting;

        let handler = DiscordHandler::new(self.event_tx.clone());
        let built = Client::builder(&self.config.bot_token, self.config.intents)
            .event_handler(handler)
            .await;
        let mut client = match built {
            Ok(client) => client,
            Err(e) => {
                self.status = ChannelStatus::Error(e.to_string());
                return Err(Error::Channel(format!("failed to build discord client: {e}")));
            }
        };

        self.http = Some(Arc::clone(&client.http));
        self.shard_manager = Some(Arc::clone(&client.shard_manager));

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!("discord client stopped: {e}");
                let _ = event_tx.send(ChannelEvent::StatusChanged(ChannelStatus::Error(
                    e.to_string(),
                )));
            }
        });

        self.status = ChannelStatus::Connected;
        info!("discord channel connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(shards) = self.shard_manager.take() {
            shards.shutdown_all().await;
        }
        self.http = None;
        self.status = ChannelStatus::Disconnected;
        info!("discord channel disconnected");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_tx.subscribe()
    }

    fn create_sender(&self) -> Result<Arc<dyn ChatSurface>> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| Error::Channel("discord bot not connected".into()))?;
        Ok(Arc::new(DiscordSender::new(Arc::clone(http))))
    }
}
