// src/reload/mod.rs

//! Live-reload signalling.
//!
//! Tasks report finished output through a [`ReloadNotifier`]. In serve mode
//! that is a [`ReloadHub`], whose subscribers are the WebSocket clients of the
//! dev server ([`server`]); one-shot builds use [`NoopNotifier`].

pub mod client;
pub mod server;

use std::fmt::Debug;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

pub use server::{start_dev_server, DevServerHandle};

/// Message pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadSignal {
    /// Reload the whole page.
    Reload,
    /// Re-fetch the given stylesheets in place, without a page reload.
    InjectStyles { paths: Vec<String> },
    /// Output changed; the client injects if every path is a stylesheet and
    /// reloads otherwise.
    Changed { paths: Vec<String> },
}

impl ReloadSignal {
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

/// Sink for reload signals.
pub trait ReloadNotifier: Send + Sync + Debug {
    fn notify(&self, signal: ReloadSignal);
}

/// Notifier that drops every signal (builds without a dev server).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReloadNotifier for NoopNotifier {
    fn notify(&self, signal: ReloadSignal) {
        debug!(?signal, "no reload listeners; dropping signal");
    }
}

/// Broadcast hub fanning signals out to every subscribed client.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadSignal>,
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReloadNotifier for ReloadHub {
    fn notify(&self, signal: ReloadSignal) {
        match self.tx.send(signal) {
            Ok(n) => debug!(listeners = n, "reload signal sent"),
            Err(broadcast::error::SendError(signal)) => {
                debug!(?signal, "no browser connected; signal dropped")
            }
        }
    }
}
