use std::sync::Arc;
use std::time::Duration;

use chatrelay_agents::{CompletionGateway, ContextBuilder, ExchangeRuntime, OpenAiGateway};
use chatrelay_channels::discord::{DiscordChannel, DiscordConfig};
use chatrelay_channels::{
    ChannelEvent, ChannelLifecycle, ChatSurface, InboundFilter, PresenceBounds,
};
use chatrelay_common::{Error, InboundMessage, Result, ThreadId};
use chatrelay_config::{AppConfig, PresenceConfig};
use chatrelay_db::{ConversationStore, SqliteConversationStore};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::bridge::{BridgeOutcome, MessageBridge};

/// How long in-flight exchanges get to finish after an interrupt.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Long-running relay: Discord in, completion provider out.
pub struct GatewayServer {
    config: AppConfig,
}

impl GatewayServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C or until the chat connection closes.
    pub async fn run(self) -> Result<()> {
        let store: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::open(&self.config.database.path)?);
        info!("conversation store at {}", self.config.database.path.display());

        let runtime = Arc::new(build_runtime(&self.config, store)?);
        info!(
            provider = runtime.gateway().provider_id(),
            model = runtime.model(),
            retain_history = self.config.conversation.retain_history,
            "exchange runtime ready"
        );
        check_provider(runtime.gateway().as_ref()).await;

        let bridge = Arc::new(
            MessageBridge::new(runtime, build_filter(&self.config))
                .with_presence(presence_bounds(&self.config.presence)),
        );

        let token = self.config.discord.bot_token.as_deref().unwrap_or_default();
        let mut channel = DiscordChannel::new(DiscordConfig::new(token)?);
        let mut events = channel.subscribe();
        channel.connect().await?;
        let surface = channel.create_sender()?;
        info!(surface = surface.channel_type(), "chat surface ready");

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("interrupt received, shutting down");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("message task failed: {e}");
                    }
                }
                event = events.recv() => match event {
                    Ok(ChannelEvent::MessageReceived(msg)) => {
                        dispatch(&mut tasks, &bridge, &surface, msg);
                    }
                    Ok(ChannelEvent::StatusChanged(status)) => {
                        info!(?status, "{} status changed", channel.display_name());
                    }
                    Ok(ChannelEvent::Error(e)) => warn!("channel error: {e}"),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event receiver lagged, messages dropped");
                    }
                    Err(RecvError::Closed) => {
                        warn!("channel event stream closed");
                        break;
                    }
                },
            }
        }

        if !tasks.is_empty() {
            info!(pending = tasks.len(), "waiting for in-flight exchanges");
            let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
                while tasks.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(aborted = tasks.len(), "shutdown grace elapsed, aborting exchanges");
                tasks.abort_all();
            }
        }

        channel.disconnect().await?;
        Ok(())
    }
}

/// Handle one inbound message on its own task.
pub fn dispatch(
    tasks: &mut JoinSet<BridgeOutcome>,
    bridge: &Arc<MessageBridge>,
    surface: &Arc<dyn ChatSurface>,
    msg: InboundMessage,
) {
    let bridge = Arc::clone(bridge);
    let surface = Arc::clone(surface);
    tasks.spawn(async move { bridge.handle(surface, msg).await });
}

/// Check the provider once at startup. An unreachable provider is logged but
/// does not stop the relay; failed exchanges fall back to apology replies.
pub async fn check_provider(gateway: &dyn CompletionGateway) -> bool {
    match gateway.health_check().await {
        Ok(true) => {
            info!(provider = gateway.provider_id(), "provider reachable");
            true
        }
        Ok(false) => {
            warn!(provider = gateway.provider_id(), "provider health check failed");
            false
        }
        Err(e) => {
            warn!(provider = gateway.provider_id(), "provider health check error: {e}");
            false
        }
    }
}

/// Wire the store, the OpenAI gateway and the configured request parameters.
pub fn build_runtime(config: &AppConfig, store: Arc<dyn ConversationStore>) -> Result<ExchangeRuntime> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .ok_or_else(|| Error::Config("provider api key is required (OPENAI_TOKEN)".into()))?;
    let gateway = Arc::new(OpenAiGateway::new(api_key, config.llm.base_url.clone()));

    let context = ContextBuilder::new(Arc::clone(&store), config.conversation.retain_history)
        .with_history_limit(config.conversation.history_limit);

    let mut runtime = ExchangeRuntime::new(store, gateway, context);
    runtime.set_model(config.llm.model.clone());
    if let Some(max_tokens) = config.llm.max_tokens {
        runtime.set_max_tokens(max_tokens);
    }
    if let Some(temperature) = config.llm.temperature {
        runtime.set_temperature(temperature);
    }
    Ok(runtime)
}

pub fn build_filter(config: &AppConfig) -> InboundFilter {
    let conversation = &config.conversation;
    InboundFilter::new()
        .with_target_channel(config.discord.channel_id.as_deref().map(ThreadId::from))
        .with_min_chars(conversation.min_message_chars)
        .with_override_token(&conversation.override_token)
        .with_commands(&conversation.instruction_command, &conversation.reset_command)
        .with_ignore_bots(conversation.ignore_bots)
}

pub fn presence_bounds(config: &PresenceConfig) -> PresenceBounds {
    let ms = |b: chatrelay_config::Bounds<u64>| (Duration::from_millis(b.min), Duration::from_millis(b.max));
    PresenceBounds {
        initial_delay: ms(config.initial_delay_ms),
        pulses: (config.pulses.min, config.pulses.max),
        pause: ms(config.pause_ms),
        max_duration: ms(config.max_duration_ms),
    }
}
