pub mod context;
pub mod locks;
pub mod openai;
pub mod providers;
pub mod recorder;
pub mod runtime;

pub use context::{AssembledContext, ContextBuilder, DEFAULT_HISTORY_LIMIT};
pub use locks::TurnLocks;
pub use openai::OpenAiGateway;
pub use providers::{ChatMessage, Completion, CompletionGateway, CompletionRequest};
pub use recorder::{ExchangeRecorder, RecordOutcome};
pub use runtime::{Exchange, ExchangeRuntime};
