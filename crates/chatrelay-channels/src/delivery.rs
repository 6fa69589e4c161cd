use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

use chatrelay_common::ThreadId;
use regex::Regex;
use tracing::{debug, error, warn};

use crate::traits::ChatSurface;

/// Shortest leading run up to and including the first ": ". Providers echo the
/// "name: " prefix they were shown on the user turn.
static AUTHOR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?: ").expect("author prefix regex should compile"));

/// Remove a leading `name: ` echo from a reply, if present.
pub fn strip_author_prefix(text: &str) -> String {
    AUTHOR_PREFIX.replace(text, "").into_owned()
}

/// Split `text` into two halves by whitespace-separated word count.
///
/// The first half gets `floor(k/2)` words, the second the rest. The separator
/// run at the cut is dropped from both halves, so `first + sep + second`
/// reconstructs the input.
pub fn split_in_half(text: &str) -> (&str, &str) {
    let mut starts = Vec::new();
    let mut prev_whitespace = true;
    for (idx, ch) in text.char_indices() {
        let whitespace = ch.is_whitespace();
        if !whitespace && prev_whitespace {
            starts.push(idx);
        }
        prev_whitespace = whitespace;
    }

    match starts.get(starts.len() / 2) {
        Some(&cut) => (text[..cut].trim_end(), &text[cut..]),
        None => (text, ""),
    }
}

/// One reply waiting for delivery. The uncleaned form is kept because the
/// oversize fallback splits the provider's original text.
#[derive(Debug, Clone)]
struct OutboundChunk {
    cleaned: String,
    original: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages the surface accepted (each half of a split counts).
    pub sent: usize,
    /// Chunks that were rejected as too large and re-sent in two halves.
    pub split: usize,
    /// Chunks or halves that could not be delivered.
    pub dropped: usize,
}

/// FIFO delivery of one exchange's replies to one thread.
///
/// Each exchange owns its pipeline, so chunks from concurrent exchanges never
/// share a queue.
pub struct DeliveryPipeline {
    surface: Arc<dyn ChatSurface>,
    thread_id: ThreadId,
    queue: VecDeque<OutboundChunk>,
}

impl DeliveryPipeline {
    pub fn new(surface: Arc<dyn ChatSurface>, thread_id: ThreadId) -> Self {
        Self {
            surface,
            thread_id,
            queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, content: &str) {
        self.queue.push_back(OutboundChunk {
            cleaned: strip_author_prefix(content),
            original: content.to_string(),
        });
    }

    /// Deliver each reply in order: strip, enqueue, drain.
    pub async fn deliver<S: AsRef<str>>(mut self, replies: &[S]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for reply in replies {
            self.enqueue(reply.as_ref());
            let drained = self.drain().await;
            report.sent += drained.sent;
            report.split += drained.split;
            report.dropped += drained.dropped;
        }
        report
    }

    /// Send everything queued, front to back, until the queue is empty.
    ///
    /// An oversize rejection triggers a single split-and-resend of the
    /// original text; halves are not split again. Any other failure drops the
    /// chunk.
    pub async fn drain(&mut self) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        while let Some(chunk) = self.queue.pop_front() {
            match self.surface.send_text(&self.thread_id, &chunk.cleaned).await {
                Ok(()) => report.sent += 1,
                Err(e) if e.is_too_large() => {
                    warn!(
                        thread = %self.thread_id,
                        chars = chunk.cleaned.chars().count(),
                        "reply too large, sending in two halves"
                    );
                    report.split += 1;

                    let (first, second) = split_in_half(&chunk.original);
                    for half in [first, second] {
                        if half.is_empty() {
                            debug!(thread = %self.thread_id, "skipping empty half");
                            continue;
                        }
                        match self.surface.send_text(&self.thread_id, half).await {
                            Ok(()) => report.sent += 1,
                            Err(e) => {
                                error!(thread = %self.thread_id, "unable to send message half: {e}");
                                report.dropped += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(thread = %self.thread_id, "unable to send message: {e}");
                    report.dropped += 1;
                }
            }
        }

        report
    }
}
