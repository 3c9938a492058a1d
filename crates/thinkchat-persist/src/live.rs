use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::error::Result;
use crate::models::{Message, Thread};
use crate::notify::StoreEvent;
use crate::store::ChatStore;

/// Stream of fresh query results, one per relevant store change
pub type LiveQuery<T> = Pin<Box<dyn Stream<Item = Result<Vec<T>>> + Send>>;

/// Every thread, most recent first; re-emitted whenever any thread or
/// message is written.
pub fn live_threads(store: Arc<dyn ChatStore>) -> LiveQuery<Thread> {
    Box::pin(async_stream::stream! {
        // Subscribe before the first read so no commit falls in between
        let mut events = store.subscribe();
        yield store.list_threads().await;

        loop {
            match events.recv().await {
                Ok(_) => yield store.list_threads().await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "live thread query lagged, re-reading");
                    yield store.list_threads().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Messages of one thread, oldest first; re-emitted on each append to it.
pub fn live_messages(store: Arc<dyn ChatStore>, thread_id: impl Into<String>) -> LiveQuery<Message> {
    let thread_id = thread_id.into();

    Box::pin(async_stream::stream! {
        let mut events = store.subscribe();
        yield store.list_messages(&thread_id).await;

        loop {
            match events.recv().await {
                Ok(StoreEvent::MessageAppended { thread_id: changed, .. }) if changed == thread_id => {
                    yield store.list_messages(&thread_id).await;
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, %thread_id, "live message query lagged, re-reading");
                    yield store.list_messages(&thread_id).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbs::memory::MemoryStore;
    use crate::models::NewMessage;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_live_messages_follow_appends() {
        let store: Arc<dyn ChatStore> = Arc::new(MemoryStore::new());
        let thread = store.create_thread("Live").await.unwrap();
        let other = store.create_thread("Other").await.unwrap();

        let mut live = live_messages(Arc::clone(&store), thread.id.clone());
        assert!(live.next().await.unwrap().unwrap().is_empty());

        store.append_message(NewMessage::user(&other.id, "elsewhere")).await.unwrap();
        store.append_message(NewMessage::user(&thread.id, "here")).await.unwrap();

        let snapshot = live.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "here");
    }

    #[tokio::test]
    async fn test_live_threads_reorder_on_append() {
        let store: Arc<dyn ChatStore> = Arc::new(MemoryStore::new());
        let first = store.create_thread("First").await.unwrap();
        let second = store.create_thread("Second").await.unwrap();

        let mut live = live_threads(Arc::clone(&store));
        let initial = live.next().await.unwrap().unwrap();
        assert_eq!(initial[0].id, second.id);

        store.append_message(NewMessage::user(&first.id, "bump")).await.unwrap();
        let reordered = live.next().await.unwrap().unwrap();
        assert_eq!(reordered[0].id, first.id);
    }
}
