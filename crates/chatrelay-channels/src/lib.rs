pub mod delivery;
pub mod inbound;
pub mod presence;
pub mod traits;

#[cfg(feature = "discord")]
pub mod discord;

#[cfg(test)]
mod testing;

pub use delivery::{DeliveryPipeline, DeliveryReport, split_in_half, strip_author_prefix};
pub use inbound::{IgnoreReason, InboundAction, InboundFilter};
pub use presence::{PresenceBounds, PresenceHandle, PresencePlan, PresenceSimulator};
pub use traits::{ChannelEvent, ChannelLifecycle, ChannelStatus, ChatSurface};
