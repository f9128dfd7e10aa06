//! Data-change notifications for the UI.
//!
//! Events carry no payload: a subscriber re-queries the data manager on
//! receipt.

use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataEvent {
    ImagesFetchStarted,
    ImagesRefreshed,
    UploadBegan,
    UploadSucceeded,
    UploadFailed,
}

impl DataEvent {
    /// Stable name understood by the mobile hosts.
    pub fn name(&self) -> &'static str {
        match self {
            DataEvent::ImagesFetchStarted => "GetAllImagesStarted",
            DataEvent::ImagesRefreshed => "ImagesRefreshed",
            DataEvent::UploadBegan => "ImageUploadBegan",
            DataEvent::UploadSucceeded => "ImageUploadSuccess",
            DataEvent::UploadFailed => "ImageUploadFailure",
        }
    }
}

/// Fan-out of `DataEvent`s to any number of subscribers.
///
/// Slow subscribers that fall more than the channel capacity behind see
/// `RecvError::Lagged` and should re-query state.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DataEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: DataEvent) {
        trace!(event = event.name(), "emit");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn emit_all(&self, events: impl IntoIterator<Item = DataEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}
