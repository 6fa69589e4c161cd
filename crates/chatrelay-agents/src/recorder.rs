use std::sync::Arc;

use chatrelay_common::{Message, NewMessage, Role, ThreadId};
use chatrelay_db::ConversationStore;
use tracing::error;

use crate::context::AssembledContext;
use crate::providers::Completion;

/// Rows written for one exchange. Persistence is best-effort per row.
#[derive(Debug, Default)]
pub struct RecordOutcome {
    pub persisted: Vec<Message>,
    pub failed: usize,
}

/// Writes the durable record of a completed exchange.
pub struct ExchangeRecorder {
    store: Arc<dyn ConversationStore>,
}

impl ExchangeRecorder {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Persist the inbound turn and every returned choice, each stamped with
    /// the exchange usage. On a bootstrap exchange the whole submitted payload
    /// (including the synthesized instruction) is stored instead of just the turn.
    pub fn record(
        &self,
        thread_id: &ThreadId,
        author: &str,
        text: &str,
        context: &AssembledContext,
        completion: &Completion,
    ) -> RecordOutcome {
        let usage = completion.usage;
        let author_for = |role: Role| {
            if role == Role::User {
                author.to_string()
            } else {
                String::new()
            }
        };

        let mut rows = Vec::with_capacity(context.payload.len() + completion.choices.len());
        if context.is_bootstrap() {
            rows.extend(context.payload.iter().map(|m| {
                NewMessage::new(thread_id.clone(), m.role, m.content.clone())
                    .with_author(author_for(m.role))
                    .with_usage(usage)
            }));
        } else {
            rows.push(
                NewMessage::new(thread_id.clone(), Role::User, text)
                    .with_author(author)
                    .with_usage(usage),
            );
        }
        rows.extend(completion.choices.iter().map(|choice| {
            NewMessage::new(thread_id.clone(), choice.role, choice.content.clone())
                .with_author(author_for(choice.role))
                .with_usage(usage)
        }));

        let mut outcome = RecordOutcome::default();
        for row in rows {
            let role = row.role;
            match self.store.append(row) {
                Ok(stored) => outcome.persisted.push(stored),
                Err(e) => {
                    error!(thread = %thread_id, %role, "unable to save message: {e}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }
}
