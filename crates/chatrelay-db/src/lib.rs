pub mod conversation_store;
pub mod migrations;

pub use conversation_store::{ConversationStore, SqliteConversationStore};
