//! Routes classified inbound messages to the exchange runtime and sends the
//! results back to the chat surface.

use std::sync::Arc;

use chatrelay_agents::ExchangeRuntime;
use chatrelay_channels::{
    ChatSurface, DeliveryPipeline, DeliveryReport, IgnoreReason, InboundAction, InboundFilter,
    PresenceBounds, PresencePlan, PresenceSimulator,
};
use chatrelay_common::{InboundMessage, ThreadId};
use tracing::{debug, error, info, warn};

use crate::fallback::pick_fallback;

pub const INSTRUCTION_CONFIRMATION: &str = "New system prompt created";
pub const RESET_CONFIRMATION: &str = "Database reset";

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    Ignored(IgnoreReason),
    InstructionSet,
    Reset,
    Replied(DeliveryReport),
    /// The exchange failed and a fallback apology was sent instead.
    Fallback,
    /// A command failed; nothing was sent.
    Failed,
}

pub struct MessageBridge {
    runtime: Arc<ExchangeRuntime>,
    filter: InboundFilter,
    presence: PresenceBounds,
}

impl MessageBridge {
    pub fn new(runtime: Arc<ExchangeRuntime>, filter: InboundFilter) -> Self {
        Self {
            runtime,
            filter,
            presence: PresenceBounds::default(),
        }
    }

    pub fn with_presence(mut self, bounds: PresenceBounds) -> Self {
        self.presence = bounds;
        self
    }

    pub fn runtime(&self) -> &Arc<ExchangeRuntime> {
        &self.runtime
    }

    pub async fn handle(&self, surface: Arc<dyn ChatSurface>, msg: InboundMessage) -> BridgeOutcome {
        match self.filter.classify(&msg) {
            InboundAction::Ignore(reason) => {
                debug!(thread = %msg.thread_id, ?reason, "ignoring message");
                BridgeOutcome::Ignored(reason)
            }
            InboundAction::SetInstruction(text) => {
                self.set_instruction(surface.as_ref(), &msg.thread_id, &text).await
            }
            InboundAction::Reset => self.reset(surface.as_ref(), &msg.thread_id).await,
            InboundAction::Converse => self.converse(surface, &msg).await,
        }
    }

    async fn set_instruction(
        &self,
        surface: &dyn ChatSurface,
        thread_id: &ThreadId,
        text: &str,
    ) -> BridgeOutcome {
        if let Err(e) = self.runtime.set_instruction(text) {
            error!("unable to store instruction: {e}");
            return BridgeOutcome::Failed;
        }

        send_notice(surface, thread_id, INSTRUCTION_CONFIRMATION).await;

        match self.runtime.announce_instruction(text).await {
            Ok(completion) => {
                for choice in &completion.choices {
                    debug!(role = %choice.role, content = %choice.content, "instruction acknowledged");
                }
            }
            Err(e) => warn!("instruction announcement failed: {e}"),
        }
        BridgeOutcome::InstructionSet
    }

    async fn reset(&self, surface: &dyn ChatSurface, thread_id: &ThreadId) -> BridgeOutcome {
        if let Err(e) = self.runtime.reset() {
            error!("unable to reset the database: {e}");
            return BridgeOutcome::Failed;
        }
        send_notice(surface, thread_id, RESET_CONFIRMATION).await;
        BridgeOutcome::Reset
    }

    /// One conversational turn. The thread's turn lock is held from context
    /// assembly until the last reply has been handed to the surface.
    async fn converse(&self, surface: Arc<dyn ChatSurface>, msg: &InboundMessage) -> BridgeOutcome {
        let thread_id = &msg.thread_id;
        let plan = PresencePlan::random(&self.presence, &mut rand::rng());
        let presence = PresenceSimulator::start(Arc::clone(&surface), thread_id.clone(), plan);

        let _turn = self.runtime.begin_turn(thread_id).await;
        let result = self
            .runtime
            .run_exchange(thread_id, &msg.author_name, &msg.content)
            .await;
        presence.stop().await;

        match result {
            Ok(exchange) => {
                let replies: Vec<String> =
                    exchange.choices.into_iter().map(|c| c.content).collect();
                let report = DeliveryPipeline::new(surface, thread_id.clone())
                    .deliver(&replies)
                    .await;
                info!(
                    thread = %thread_id,
                    sent = report.sent,
                    split = report.split,
                    dropped = report.dropped,
                    "reply delivered"
                );
                BridgeOutcome::Replied(report)
            }
            Err(e) => {
                warn!(thread = %thread_id, "exchange failed: {e}");
                let apology = pick_fallback(&mut rand::rng());
                send_notice(surface.as_ref(), thread_id, apology).await;
                BridgeOutcome::Fallback
            }
        }
    }
}

async fn send_notice(surface: &dyn ChatSurface, thread_id: &ThreadId, text: &str) {
    if let Err(e) = surface.send_text(thread_id, text).await {
        error!(thread = %thread_id, "unable to send message: {e}");
    }
}
