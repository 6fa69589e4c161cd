pub mod error;
pub mod message;
pub mod types;

pub use error::{Error, Result};
pub use message::{InboundMessage, Message, NewMessage, Role, Usage};
pub use types::ThreadId;
