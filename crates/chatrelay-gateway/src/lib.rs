pub mod bridge;
pub mod fallback;
pub mod server;

pub use bridge::{BridgeOutcome, MessageBridge};
pub use fallback::{FALLBACK_REPLIES, pick_fallback};
pub use server::GatewayServer;
