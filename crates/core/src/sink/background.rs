//! Off-thread event writing.
//!
//! Events are queued on an unbounded channel and written by a single
//! blocking writer task, so emitting never waits on disk and submission
//! order is kept.

use super::EventSink;
use ac_protocol::Event;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

/// [`EventSink`] delegating to another sink on a background writer.
#[derive(Debug)]
pub struct BackgroundEventSink {
    tx: Mutex<Option<UnboundedSender<Event>>>,
    writer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundEventSink {
    /// Start the writer. Must be called within a tokio runtime.
    pub fn spawn(inner: Arc<dyn EventSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let writer = tokio::task::spawn_blocking(move || {
            while let Some(event) = rx.blocking_recv() {
                inner.emit(event);
            }
        });
        Self {
            tx: Mutex::new(Some(tx)),
            writer: tokio::sync::Mutex::new(Some(writer)),
        }
    }

    /// Stop accepting events, then wait until every queued event is written.
    pub async fn shutdown(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                tracing::warn!(error = %e, "Event writer task failed");
            }
        }
    }
}

impl EventSink for BackgroundEventSink {
    fn emit(&self, event: Event) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.send(event) {
                    tracing::warn!(kind = %e.0.kind, "Event writer is gone, dropping event");
                }
            }
            None => tracing::warn!(kind = %event.kind, "Event sink shut down, dropping event"),
        }
    }
}
