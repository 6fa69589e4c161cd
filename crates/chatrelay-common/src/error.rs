/// Errors shared across every chatrelay crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(String),

    #[error("completion error: {0}")]
    Agent(String),

    #[error("message too large: {0}")]
    MessageTooLarge(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the chat surface refused a message because of its size.
    pub fn is_too_large(&self) -> bool {
        matches!(self, Error::MessageTooLarge(_))
    }
}
