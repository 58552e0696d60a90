//! Mocks and fixtures shared by the Skein crates' tests.

mod completion;
mod llm;
mod notifier;

pub use completion::MockCompletion;
pub use llm::MockLlmClient;
pub use notifier::RecordingNotifier;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
