use chatrelay_common::{InboundMessage, ThreadId};
use chrono::{DateTime, Utc};
use serenity::all::{self as serenity_model, UserId};

/// Convert a serenity Discord message into an `InboundMessage`.
///
/// The Discord channel id becomes the thread id. `bot_id` is the connected
/// bot's own user id, if `ready` has fired yet.
pub fn discord_message_to_inbound(
    msg: &serenity_model::Message,
    bot_id: Option<UserId>,
) -> InboundMessage {
    InboundMessage {
        id: msg.id.to_string(),
        thread_id: thread_for_channel(msg.channel_id.get()),
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        content: msg.content.clone(),
        from_self: bot_id.is_some_and(|id| id == msg.author.id),
        from_bot: msg.author.bot,
        timestamp: timestamp_from_unix(msg.timestamp.unix_timestamp()),
    }
}

pub fn thread_for_channel(channel_id: u64) -> ThreadId {
    ThreadId::from_string(channel_id.to_string())
}

fn timestamp_from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_snowflake_is_thread_id() {
        assert_eq!(thread_for_channel(123456789012345678).as_str(), "123456789012345678");
    }

    #[test]
    fn unix_timestamp_converts() {
        let ts = timestamp_from_unix(1_700_000_000);
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }
}
