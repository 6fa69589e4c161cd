//! Classification of inbound chat messages into ignored messages, commands
//! and conversational turns.

use chatrelay_common::{InboundMessage, ThreadId};

/// Why an inbound message was dropped without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    SelfAuthored,
    Bot,
    TooShort,
    OtherChannel,
}

/// What the bridge should do with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    Ignore(IgnoreReason),
    /// Replace the instruction with the given text.
    SetInstruction(String),
    /// Wipe every stored conversation.
    Reset,
    /// Run a conversational exchange with the message content.
    Converse,
}

#[derive(Debug, Clone)]
pub struct InboundFilter {
    target_channel: Option<ThreadId>,
    min_chars: usize,
    override_token: String,
    instruction_command: String,
    reset_command: String,
    ignore_bots: bool,
}

impl Default for InboundFilter {
    fn default() -> Self {
        Self {
            target_channel: None,
            min_chars: 3,
            override_token: "jp".to_string(),
            instruction_command: "!systemprompt".to_string(),
            reset_command: "!resetdb".to_string(),
            ignore_bots: false,
        }
    }
}

impl InboundFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only converse in this thread. Instruction commands are still accepted
    /// from anywhere.
    pub fn with_target_channel(mut self, channel: Option<ThreadId>) -> Self {
        self.target_channel = channel;
        self
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Token that lets a short message through. Matched case-insensitively.
    pub fn with_override_token(mut self, token: &str) -> Self {
        self.override_token = token.to_lowercase();
        self
    }

    /// Also drop messages from other bot accounts. Off by default: only the
    /// relay's own messages are dropped.
    pub fn with_ignore_bots(mut self, ignore: bool) -> Self {
        self.ignore_bots = ignore;
        self
    }

    pub fn with_commands(mut self, instruction: &str, reset: &str) -> Self {
        self.instruction_command = instruction.to_string();
        self.reset_command = reset.to_string();
        self
    }

    pub fn classify(&self, msg: &InboundMessage) -> InboundAction {
        if msg.from_self {
            return InboundAction::Ignore(IgnoreReason::SelfAuthored);
        }
        if self.ignore_bots && msg.from_bot {
            return InboundAction::Ignore(IgnoreReason::Bot);
        }

        let content = msg.content.as_str();
        if content.chars().count() < self.min_chars && !self.has_override(content) {
            return InboundAction::Ignore(IgnoreReason::TooShort);
        }

        if !self.instruction_command.is_empty() && content.contains(&self.instruction_command) {
            let text = content.replacen(&self.instruction_command, "", 1);
            return InboundAction::SetInstruction(text.trim().to_string());
        }

        if let Some(target) = &self.target_channel
            && target != &msg.thread_id
        {
            return InboundAction::Ignore(IgnoreReason::OtherChannel);
        }

        if content == self.reset_command {
            return InboundAction::Reset;
        }

        InboundAction::Converse
    }

    fn has_override(&self, content: &str) -> bool {
        !self.override_token.is_empty() && content.to_lowercase().contains(&self.override_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(thread: &str, content: &str) -> InboundMessage {
        InboundMessage {
            id: "m1".to_string(),
            thread_id: ThreadId::from(thread),
            author_id: "u1".to_string(),
            author_name: "alice".to_string(),
            content: content.to_string(),
            from_self: false,
            from_bot: false,
            timestamp: Utc::now(),
        }
    }

    fn filter() -> InboundFilter {
        InboundFilter::new().with_target_channel(Some(ThreadId::from("main")))
    }

    #[test]
    fn self_authored_messages_are_ignored() {
        let mut m = msg("main", "hello there");
        m.from_self = true;
        m.from_bot = true;
        assert_eq!(filter().classify(&m), InboundAction::Ignore(IgnoreReason::SelfAuthored));
    }

    #[test]
    fn other_bots_converse_unless_filtered() {
        let mut m = msg("main", "hello there");
        m.from_bot = true;
        assert_eq!(filter().classify(&m), InboundAction::Converse);
        assert_eq!(
            filter().with_ignore_bots(true).classify(&m),
            InboundAction::Ignore(IgnoreReason::Bot)
        );
    }

    #[test]
    fn short_messages_need_override_token() {
        let f = filter();
        assert_eq!(f.classify(&msg("main", "ok")), InboundAction::Ignore(IgnoreReason::TooShort));
        assert_eq!(f.classify(&msg("main", "jP")), InboundAction::Converse);
        assert_eq!(f.classify(&msg("main", "hey")), InboundAction::Converse);
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        assert_eq!(filter().classify(&msg("main", "héé")), InboundAction::Converse);
    }

    #[test]
    fn instruction_command_accepted_from_any_channel() {
        let action = filter().classify(&msg("elsewhere", "!systemprompt  You are a pirate. "));
        assert_eq!(action, InboundAction::SetInstruction("You are a pirate.".to_string()));
    }

    #[test]
    fn instruction_token_removed_once() {
        let action = filter().classify(&msg("main", "say !systemprompt literally: !systemprompt"));
        assert_eq!(action, InboundAction::SetInstruction("say  literally: !systemprompt".to_string()));
    }

    #[test]
    fn other_channels_are_ignored() {
        assert_eq!(
            filter().classify(&msg("elsewhere", "hello")),
            InboundAction::Ignore(IgnoreReason::OtherChannel)
        );
        assert_eq!(InboundFilter::new().classify(&msg("elsewhere", "hello")), InboundAction::Converse);
    }

    #[test]
    fn reset_requires_exact_match() {
        let f = filter();
        assert_eq!(f.classify(&msg("main", "!resetdb")), InboundAction::Reset);
        assert_eq!(f.classify(&msg("main", "!resetdb please")), InboundAction::Converse);
        assert_eq!(
            f.classify(&msg("elsewhere", "!resetdb")),
            InboundAction::Ignore(IgnoreReason::OtherChannel)
        );
    }

    #[test]
    fn custom_commands_and_token() {
        let f = InboundFilter::new()
            .with_min_chars(5)
            .with_override_token("BOT")
            .with_commands("/prompt", "/wipe");
        assert_eq!(f.classify(&msg("x", "bot?")), InboundAction::Converse);
        assert_eq!(f.classify(&msg("x", "hmm")), InboundAction::Ignore(IgnoreReason::TooShort));
        assert_eq!(f.classify(&msg("x", "/wipe")), InboundAction::Reset);
        assert_eq!(f.classify(&msg("x", "/prompt be nice")), InboundAction::SetInstruction("be nice".to_string()));
    }
}
