use std::sync::Arc;

use chatrelay_common::{Message, Role, ThreadId};
use chatrelay_db::ConversationStore;
use tracing::{debug, warn};

use crate::providers::ChatMessage;

/// Number of prior turns replayed to the provider when history is retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Payload ready for the completion call, plus what the recorder needs to know
/// about the thread's state before this turn.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub payload: Vec<ChatMessage>,
    /// Full thread history as read, before truncation.
    pub history: Vec<Message>,
}

impl AssembledContext {
    /// First exchange in the thread: the instruction was synthesized into the payload.
    pub fn is_bootstrap(&self) -> bool {
        self.history.is_empty()
    }
}

/// Builds provider payloads from stored thread history and the global instruction.
pub struct ContextBuilder {
    store: Arc<dyn ConversationStore>,
    history_limit: usize,
    retain_history: bool,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn ConversationStore>, retain_history: bool) -> Self {
        Self {
            store,
            history_limit: DEFAULT_HISTORY_LIMIT,
            retain_history,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Read the thread and instruction and assemble the payload for a new turn.
    ///
    /// Storage failures degrade instead of failing the turn: an unreadable
    /// history counts as a new thread and a missing instruction becomes "".
    pub fn build(&self, thread_id: &ThreadId, author: &str, text: &str) -> AssembledContext {
        let history = self.store.list_by_thread(thread_id).unwrap_or_else(|e| {
            warn!(thread = %thread_id, "failed to read history, treating thread as new: {e}");
            Vec::new()
        });

        let instruction = match self.store.get_instruction() {
            Ok(Some(text)) => text,
            Ok(None) => String::new(),
            Err(e) => {
                warn!("failed to read instruction, using empty instruction: {e}");
                String::new()
            }
        };

        let payload = assemble_payload(
            &history,
            &instruction,
            author,
            text,
            self.history_limit,
            self.retain_history,
        );

        debug!(
            thread = %thread_id,
            history_len = history.len(),
            payload_len = payload.len(),
            "assembled completion payload"
        );

        AssembledContext { payload, history }
    }
}

/// Order the provider payload for one turn.
///
/// - new thread: `[system(instruction), user(turn)]`
/// - retained history: the newest `limit` prior turns, then `system(instruction)`, then the turn
/// - history not retained: `[user(instruction), user(turn)]`
pub fn assemble_payload(
    history: &[Message],
    instruction: &str,
    author: &str,
    text: &str,
    limit: usize,
    retain_history: bool,
) -> Vec<ChatMessage> {
    let recent = &history[history.len().saturating_sub(limit)..];

    let mut payload = Vec::with_capacity(recent.len() + 2);
    if history.is_empty() {
        payload.push(ChatMessage::system(instruction));
    } else if retain_history {
        payload.extend(
            recent
                .iter()
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        );
        payload.push(ChatMessage::system(instruction));
    } else {
        payload.push(ChatMessage::new(Role::User, instruction));
    }

    payload.push(ChatMessage::user(format!("{author}: {text}")));
    payload
}
