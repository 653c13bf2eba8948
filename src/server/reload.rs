// src/server/reload.rs

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Message pushed to connected browsers.
///
/// Serialised as JSON on the event stream:
/// `{"type":"full"}` or `{"type":"inject","paths":["style.min.css"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Reload the whole page.
    Full,
    /// Swap the named assets in place. Stylesheets are re-fetched without a
    /// page reload; anything else falls back to a full reload client-side.
    Inject { paths: Vec<String> },
}

/// Cloneable sender side of the reload channel.
///
/// Pipelines and the watch session hold a clone; the dev server subscribes
/// once per connected browser. With nobody subscribed, notifications are
/// dropped.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: broadcast::Sender<ReloadEvent>,
}

impl ReloadHandle {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Number of connected listeners.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Broadcast an event; returns how many listeners received it.
    pub fn notify(&self, event: ReloadEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => {
                debug!(listeners = n, "reload event sent");
                n
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "no reload listeners; event dropped");
                0
            }
        }
    }

    pub fn reload(&self) -> usize {
        self.notify(ReloadEvent::Full)
    }

    pub fn inject<I, S>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notify(ReloadEvent::Inject {
            paths: paths.into_iter().map(Into::into).collect(),
        })
    }
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}
