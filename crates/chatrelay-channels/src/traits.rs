use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_common::{InboundMessage, Result, ThreadId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle management for a chat platform connection (connect, disconnect, status).
#[async_trait]
pub trait ChannelLifecycle: Send {
    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Start the channel, connecting to the external service.
    async fn connect(&mut self) -> Result<()>;

    /// Gracefully disconnect from the external service.
    async fn disconnect(&mut self) -> Result<()>;

    /// Current connection status.
    fn status(&self) -> ChannelStatus;

    /// Subscribe to inbound events. Each subscriber sees every event.
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    /// Create a send-only handle for this channel. Fails before `connect`.
    ///
    /// The returned surface is independent of the lifecycle and is shared
    /// by every exchange task via `Arc`.
    fn create_sender(&self) -> Result<Arc<dyn ChatSurface>>;
}

/// Outbound side of a chat platform as seen by one exchange.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Unique identifier for this channel type.
    fn channel_type(&self) -> &str;

    /// Post `text` to the thread. Fails with `Error::MessageTooLarge` when the
    /// platform refuses the message because of its size.
    async fn send_text(&self, thread_id: &ThreadId, text: &str) -> Result<()>;

    /// Show the "participant is typing" indicator in the thread.
    async fn signal_typing(&self, thread_id: &ThreadId) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

#[derive(Debug, Clone)]
pub enum ChannelEvent {
    MessageReceived(InboundMessage),
    StatusChanged(ChannelStatus),
    Error(String),
}
