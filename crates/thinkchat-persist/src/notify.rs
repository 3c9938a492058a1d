use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Change notification, sent only after the write it describes committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ThreadCreated {
        thread_id: String,
    },
    MessageAppended {
        thread_id: String,
        message_id: String,
    },
}

impl StoreEvent {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::ThreadCreated { thread_id } | Self::MessageAppended { thread_id, .. } => thread_id,
        }
    }
}

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of [`StoreEvent`]s to any number of subscribers
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StoreEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn notify(&self, event: StoreEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
