use std::sync::Arc;

use tokio::sync::watch;

use crate::pipeline::types::ScanStatus;

type Slot = Option<Arc<ScanStatus>>;

/// Single-slot, overwrite-latest status handoff. Not a queue: an observer
/// that polls slowly only ever sees the most recent value.
#[derive(Clone)]
pub struct StatusChannel {
    tx: Arc<watch::Sender<Slot>>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces any prior value, read or not.
    pub fn publish(&self, status: ScanStatus) {
        tracing::debug!("Publishing status: {}", status.message());
        self.tx.send_replace(Some(Arc::new(status)));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn peek(&self) -> Option<Arc<ScanStatus>> {
        self.tx.borrow().clone()
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side handed to observers.
#[derive(Clone)]
pub struct StatusReader {
    rx: watch::Receiver<Slot>,
}

impl StatusReader {
    pub fn peek(&self) -> Option<Arc<ScanStatus>> {
        self.rx.borrow().clone()
    }

    /// Waits for the next publish or clear. Returns false once the session is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
