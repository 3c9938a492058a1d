use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::clock::MonotonicClock;
use crate::error::{PersistError, Result};
use crate::models::{Message, NewMessage, Thread};
use crate::notify::{ChangeNotifier, StoreEvent};
use crate::store::ChatStore;

#[derive(Default)]
struct Collections {
    threads: HashMap<String, Thread>,
    /// Per-thread messages in insertion order, which is `created_at` order
    messages: HashMap<String, Vec<Message>>,
}

/// Process-local store, used by tests and the `memory` backend
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
    clock: MonotonicClock,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let thread = {
            let mut inner = self.inner.write().await;
            let thread = Thread::new(title, self.clock.now());
            inner.threads.insert(thread.id.clone(), thread.clone());
            thread
        };

        tracing::debug!(thread_id = %thread.id, "thread created");
        self.notifier.notify(StoreEvent::ThreadCreated {
            thread_id: thread.id.clone(),
        });
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.inner.read().await.threads.get(thread_id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self.inner.read().await.threads.values().cloned().collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message> {
        let message = {
            let mut inner = self.inner.write().await;
            // Timestamp is taken under the lock so insertion order matches it
            let now = self.clock.now();
            let thread = inner
                .threads
                .get_mut(&message.thread_id)
                .ok_or_else(|| PersistError::ThreadNotFound(message.thread_id.clone()))?;
            thread.updated_at = now;

            let message = message.into_message(now);
            inner
                .messages
                .entry(message.thread_id.clone())
                .or_default()
                .push(message.clone());
            message
        };

        tracing::debug!(thread_id = %message.thread_id, message_id = %message.id, "message appended");
        self.notifier.notify(StoreEvent::MessageAppended {
            thread_id: message.thread_id.clone(),
            message_id: message.id.clone(),
        });
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[tokio::test]
    async fn test_missing_thread_leaves_store_unchanged() {
        let store = MemoryStore::new();
        let err = store
            .append_message(NewMessage::user("missing", "hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::ThreadNotFound(id) if id == "missing"));
        assert!(store.list_messages("missing").await.unwrap().is_empty());
        assert!(store.list_threads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_bumps_updated_at() {
        let store = MemoryStore::new();
        let thread = store.create_thread("Notes").await.unwrap();
        assert_eq!(thread.created_at, thread.updated_at);

        let message = store
            .append_message(NewMessage::assistant(&thread.id, "answer", "reasoning"))
            .await
            .unwrap();
        assert_eq!(message.role, MessageRole::Assistant);

        let reloaded = store.get_thread(&thread.id).await.unwrap().unwrap();
        assert_eq!(reloaded.updated_at, message.created_at);
        assert_eq!(reloaded.created_at, thread.created_at);
    }
}
