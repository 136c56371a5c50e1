use std::sync::{Arc, Mutex};

use assetpipe::reload::{ReloadNotifier, ReloadSignal};

/// Notifier that keeps every signal for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    signals: Arc<Mutex<Vec<ReloadSignal>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<ReloadSignal> {
        self.signals.lock().unwrap().clone()
    }
}

impl ReloadNotifier for RecordingNotifier {
    fn notify(&self, signal: ReloadSignal) {
        self.signals.lock().unwrap().push(signal);
    }
}
