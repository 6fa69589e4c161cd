use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatrelay_common::{Error, Result, ThreadId};

use crate::traits::ChatSurface;

/// In-memory surface that records what it was asked to send.
#[derive(Default)]
pub struct RecordingSurface {
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    typing: AtomicUsize,
    max_chars: Option<usize>,
    fail_on: Option<String>,
    typing_fails: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn with_failing_typing(mut self) -> Self {
        self.typing_fails = true;
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn typing_signals(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatSurface for RecordingSurface {
    fn channel_type(&self) -> &str {
        "recording"
    }

    async fn send_text(&self, _thread_id: &ThreadId, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(text) {
            return Err(Error::Channel("send rejected".into()));
        }
        if let Some(max) = self.max_chars
            && text.chars().count() > max
        {
            return Err(Error::MessageTooLarge(format!("{} > {max}", text.chars().count())));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn signal_typing(&self, _thread_id: &ThreadId) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        if self.typing_fails {
            return Err(Error::Channel("typing endpoint unavailable".into()));
        }
        Ok(())
    }
}
