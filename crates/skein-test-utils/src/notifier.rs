use std::sync::Mutex;

use skein_core::traits::Notifier;
use skein_core::types::Notice;

use crate::lock;

/// Notifier that keeps every notice for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    /// Every rendered line: info lines, report titles and report bodies.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.notices)
            .iter()
            .flat_map(|n| match n {
                Notice::Info(line) => vec![line.clone()],
                Notice::Report { title, body } => {
                    std::iter::once(title.clone()).chain(body.iter().cloned()).collect()
                }
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        lock(&self.notices).push(notice);
    }
}
