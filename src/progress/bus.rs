//! Broadcast relay of progress updates to any number of subscribers
//!
//! Publishing never blocks. With no subscribers an update is dropped; a slow
//! subscriber loses the oldest buffered updates and is told how many.

use super::{ProgressEvent, ProgressHandler, ProgressUpdate};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventBusError {
    #[error("event bus closed")]
    Closed,

    #[error("subscriber lagged behind by {0} updates")]
    Lagged(u64),
}

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ProgressUpdate>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, update: ProgressUpdate) {
        match self.sender.send(update) {
            Ok(receivers) => debug!(receivers, "Published progress update"),
            Err(_) => debug!("No subscribers listening for progress"),
        }
    }

    /// All sessions' updates
    pub fn subscribe(&self) -> UpdateReceiver {
        UpdateReceiver {
            receiver: self.sender.subscribe(),
            session_id: None,
        }
    }

    /// Only updates for `session_id`
    pub fn subscribe_session(&self, session_id: impl Into<String>) -> UpdateReceiver {
        UpdateReceiver {
            receiver: self.sender.subscribe(),
            session_id: Some(session_id.into()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressHandler for EventBus {
    fn on_progress(&self, event: &ProgressEvent) {
        if let ProgressEvent::Update(update) = event {
            self.publish(update.clone());
        }
    }
}

pub struct UpdateReceiver {
    receiver: broadcast::Receiver<ProgressUpdate>,
    session_id: Option<String>,
}

impl UpdateReceiver {
    /// Next matching update. Lagging is reported once and the receiver keeps
    /// going from the oldest update still buffered.
    pub async fn recv(&mut self) -> Result<ProgressUpdate, EventBusError> {
        loop {
            let update = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!(skipped = n, "Progress subscriber lagged");
                    EventBusError::Lagged(n)
                }
            })?;

            match &self.session_id {
                Some(id) if *id != update.session_id => continue,
                _ => return Ok(update),
            }
        }
    }
}
