use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::models::{Message, NewMessage, Thread};
use crate::notify::StoreEvent;

/// Storage contract for threads and messages
///
/// Implementations must apply [`append_message`](ChatStore::append_message)
/// atomically: the new message and the owning thread's `updated_at` become
/// visible together or not at all. Notifications go out after commit.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert a thread with `created_at == updated_at == now`
    async fn create_thread(&self, title: &str) -> Result<Thread>;

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// All threads, most recently active first
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    /// Insert a message and bump its thread's `updated_at` to the message's
    /// `created_at`. Fails with `ThreadNotFound` and writes nothing when the
    /// thread does not exist.
    async fn append_message(&self, message: NewMessage) -> Result<Message>;

    /// Messages of a thread, oldest first. Unknown threads yield an empty list.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
