use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_common::{Error, Result, ThreadId};
use serenity::all::{ChannelId, Http, HttpError, ModelError};
use tracing::debug;

use crate::traits::ChatSurface;

/// Discord's per-message content limit, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// JSON error code Discord returns for an invalid form body, which is what an
/// oversized message produces.
const INVALID_FORM_BODY: isize = 50035;

/// Send-only handle over the serenity HTTP client.
pub struct DiscordSender {
    http: Arc<Http>,
}

impl DiscordSender {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn parse_channel(thread_id: &ThreadId) -> Result<ChannelId> {
    thread_id
        .as_str()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
        .ok_or_else(|| Error::Channel(format!("invalid discord channel id: {thread_id}")))
}

fn check_length(text: &str) -> Result<()> {
    let chars = text.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(Error::MessageTooLarge(format!(
            "{chars} characters exceeds discord limit of {MAX_MESSAGE_CHARS}"
        )));
    }
    Ok(())
}

fn classify_send_error(err: serenity::Error) -> Error {
    match err {
        serenity::Error::Model(ModelError::MessageTooLong(over)) => {
            Error::MessageTooLarge(format!("discord rejected message: {over} characters over limit"))
        }
        serenity::Error::Http(ref e) => {
            let e: &HttpError = e;
            match e {
                HttpError::UnsuccessfulRequest(resp) if resp.error.code == INVALID_FORM_BODY => {
                    Error::MessageTooLarge(format!("discord rejected message: {}", resp.error.message))
                }
                _ => Error::Channel(format!("discord send failed: {err}")),
            }
        }
        other => Error::Channel(format!("discord send failed: {other}")),
    }
}

#[async_trait]
impl ChatSurface for DiscordSender {
    fn channel_type(&self) -> &str {
        "discord"
    }

    async fn send_text(&self, thread_id: &ThreadId, text: &str) -> Result<()> {
        let channel = parse_channel(thread_id)?;
        check_length(text)?;

        debug!("discord: sending to {channel} ({} chars)", text.chars().count());
        channel
            .say(&*self.http, text)
            .await
            .map(|_| ())
            .map_err(classify_send_error)
    }

    async fn signal_typing(&self, thread_id: &ThreadId) -> Result<()> {
        let channel = parse_channel(thread_id)?;
        channel
            .broadcast_typing(&self.http)
            .await
            .map_err(|e| Error::Channel(format!("discord typing failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ids_must_be_snowflakes() {
        assert_eq!(parse_channel(&ThreadId::from("42")).unwrap(), ChannelId::new(42));
        assert!(parse_channel(&ThreadId::from("general")).is_err());
        assert!(parse_channel(&ThreadId::from("0")).is_err());
    }

    #[test]
    fn long_text_rejected_locally() {
        assert!(check_length(&"a".repeat(MAX_MESSAGE_CHARS)).is_ok());
        let err = check_length(&"a".repeat(MAX_MESSAGE_CHARS + 1)).unwrap_err();
        assert!(err.is_too_large());
    }

    #[test]
    fn limit_counts_chars() {
        assert!(check_length(&"é".repeat(MAX_MESSAGE_CHARS)).is_ok());
    }

    #[test]
    fn model_length_error_is_too_large() {
        let err = classify_send_error(serenity::Error::Model(ModelError::MessageTooLong(12)));
        assert!(err.is_too_large());
    }

    #[test]
    fn other_errors_are_channel_errors() {
        let err = classify_send_error(serenity::Error::Other("gateway closed"));
        assert!(matches!(err, Error::Channel(_)));
    }
}
