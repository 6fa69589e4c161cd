pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    AppConfig, Bounds, ConversationConfig, DatabaseConfig, DiscordSection, LlmConfig,
    PresenceConfig,
};
