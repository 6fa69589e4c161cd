use std::sync::Arc;

use chatrelay_common::{Error, Result, ThreadId, Usage};
use chatrelay_db::ConversationStore;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument};

use crate::context::ContextBuilder;
use crate::locks::TurnLocks;
use crate::providers::{ChatMessage, Completion, CompletionGateway, CompletionRequest};
use crate::recorder::{ExchangeRecorder, RecordOutcome};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Result of one successful exchange: the provider's choices in order.
#[derive(Debug)]
pub struct Exchange {
    pub choices: Vec<ChatMessage>,
    pub usage: Usage,
    pub recorded: RecordOutcome,
}

/// Runs exchanges against the completion gateway and owns the per-thread
/// turn locks and the instruction lifecycle.
pub struct ExchangeRuntime {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn CompletionGateway>,
    context: ContextBuilder,
    recorder: ExchangeRecorder,
    turn_locks: TurnLocks,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl ExchangeRuntime {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        gateway: Arc<dyn CompletionGateway>,
        context: ContextBuilder,
    ) -> Self {
        Self {
            recorder: ExchangeRecorder::new(Arc::clone(&store)),
            store,
            gateway,
            context,
            turn_locks: TurnLocks::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.max_tokens = Some(max_tokens);
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = Some(temperature);
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn CompletionGateway> {
        &self.gateway
    }

    /// Wait for exclusive use of `thread_id`. Hold the guard until the turn's
    /// replies have been delivered.
    pub async fn begin_turn(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()> {
        self.turn_locks.acquire(thread_id).await
    }

    fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Assemble context, call the provider once and record the exchange.
    ///
    /// Nothing is persisted when the provider fails or returns no choices.
    #[instrument(skip(self, thread_id, author, text), fields(thread = %thread_id))]
    pub async fn run_exchange(
        &self,
        thread_id: &ThreadId,
        author: &str,
        text: &str,
    ) -> Result<Exchange> {
        let context = self.context.build(thread_id, author, text);
        let request = self.request(context.payload.clone());

        let completion = self.gateway.complete(&request).await?;
        if completion.choices.is_empty() {
            return Err(Error::Agent("provider returned no choices".into()));
        }

        let recorded = self
            .recorder
            .record(thread_id, author, text, &context, &completion);

        info!(
            total_tokens = completion.usage.total_tokens,
            completion_tokens = completion.usage.completion_tokens,
            prompt_tokens = completion.usage.prompt_tokens,
            bootstrap = context.is_bootstrap(),
            rows = recorded.persisted.len(),
            "usage"
        );

        Ok(Exchange {
            choices: completion.choices,
            usage: completion.usage,
            recorded,
        })
    }

    /// Replace the process-wide instruction shared by every thread.
    pub fn set_instruction(&self, text: &str) -> Result<()> {
        self.store.set_instruction(text)?;
        info!(chars = text.len(), "instruction updated");
        Ok(())
    }

    /// Submit the instruction to the provider on its own as a system message.
    pub async fn announce_instruction(&self, text: &str) -> Result<Completion> {
        let request = self.request(vec![ChatMessage::system(text)]);
        let completion = self.gateway.complete(&request).await?;
        info!(
            total_tokens = completion.usage.total_tokens,
            choices = completion.choices.len(),
            "instruction announced to provider"
        );
        Ok(completion)
    }

    /// Drop every stored message and the instruction.
    pub fn reset(&self) -> Result<()> {
        self.store.reset_all()
    }
}
