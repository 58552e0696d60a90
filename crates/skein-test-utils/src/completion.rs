use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Completion;

use crate::lock;

enum Mode {
    Always(String),
    Sequence(VecDeque<String>),
    Failing(String),
    Pending,
}

/// Scripted completion backend. Records every prompt it receives.
pub struct MockCompletion {
    mode: Mutex<Mode>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer every prompt with the same text.
    pub fn always(text: impl Into<String>) -> Self {
        Self::with_mode(Mode::Always(text.into()))
    }

    /// Answer prompts in order; fails once the script runs out.
    pub fn sequence<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::with_mode(Mode::Sequence(
            responses.into_iter().map(Into::into).collect(),
        ))
    }

    /// Fail every prompt with `LlmRequest(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_mode(Mode::Failing(message.into()))
    }

    /// Never answer.
    pub fn pending() -> Self {
        Self::with_mode(Mode::Pending)
    }

    /// Sleep before answering (tokio time, so paused clocks apply).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    fn next_response(&self) -> Option<Result<String>> {
        let mut mode = lock(&self.mode);
        match &mut *mode {
            Mode::Always(text) => Some(Ok(text.clone())),
            Mode::Sequence(queue) => Some(queue.pop_front().ok_or_else(|| {
                SkeinError::LlmRequest("mock completion script exhausted".into())
            })),
            Mode::Failing(message) => Some(Err(SkeinError::LlmRequest(message.clone()))),
            Mode::Pending => None,
        }
    }
}

impl Completion for MockCompletion {
    fn complete(&self, prompt: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            lock(&self.prompts).push(prompt);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.next_response() {
                Some(response) => response,
                None => std::future::pending().await,
            }
        })
    }
}
