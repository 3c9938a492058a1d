use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::{Client, Collection, IndexModel};
use tokio::sync::broadcast;

use super::models::{MongoMessage, MongoThread};
use crate::clock::MonotonicClock;
use crate::error::{PersistError, Result};
use crate::models::{Message, NewMessage, Thread};
use crate::notify::{ChangeNotifier, StoreEvent};
use crate::store::ChatStore;

/// Store backed by a MongoDB database
///
/// Appends run in a multi-document transaction, which needs a replica set
/// (a single-node replica set is enough).
pub struct MongoStore {
    client: Client,
    threads: Collection<MongoThread>,
    messages: Collection<MongoMessage>,
    clock: MonotonicClock,
    notifier: ChangeNotifier,
}

impl MongoStore {
    /// Connect to MongoDB and make sure the indexes exist
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        tracing::info!(database, "connecting to mongodb store");

        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let db = client.database(database);
        let threads: Collection<MongoThread> = db.collection("threads");
        let messages: Collection<MongoMessage> = db.collection("messages");

        threads
            .create_index(IndexModel::builder().keys(doc! { "updated_at": -1 }).build())
            .await?;
        messages
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "thread_id": 1, "created_at": 1 })
                    .build(),
            )
            .await?;

        let latest = threads
            .find_one(doc! {})
            .sort(doc! { "updated_at": -1 })
            .await?
            .map(|t| t.updated_at.timestamp_millis())
            .unwrap_or_default();

        Ok(Self {
            client,
            threads,
            messages,
            clock: MonotonicClock::starting_after(latest),
            notifier: ChangeNotifier::new(),
        })
    }
}

#[async_trait]
impl ChatStore for MongoStore {
    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let thread = Thread::new(title, self.clock.now());
        self.threads.insert_one(MongoThread::from(&thread)).await?;

        tracing::debug!(thread_id = %thread.id, "thread created");
        self.notifier.notify(StoreEvent::ThreadCreated {
            thread_id: thread.id.clone(),
        });
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let thread = self.threads.find_one(doc! { "_id": thread_id }).await?;
        Ok(thread.map(Thread::from))
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let threads: Vec<MongoThread> = self
            .threads
            .find(doc! {})
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads.into_iter().map(Thread::from).collect())
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message> {
        let now = self.clock.now();
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        // $max keeps updated_at monotonic when appends from this store interleave
        let updated = self
            .threads
            .update_one(
                doc! { "_id": &message.thread_id },
                doc! { "$max": { "updated_at": bson::DateTime::from_chrono(now) } },
            )
            .session(&mut session)
            .await?;

        if updated.matched_count == 0 {
            session.abort_transaction().await?;
            return Err(PersistError::ThreadNotFound(message.thread_id));
        }

        let message = message.into_message(now);
        self.messages
            .insert_one(MongoMessage::from(&message))
            .session(&mut session)
            .await?;
        session.commit_transaction().await?;

        tracing::debug!(thread_id = %message.thread_id, message_id = %message.id, "message appended");
        self.notifier.notify(StoreEvent::MessageAppended {
            thread_id: message.thread_id.clone(),
            message_id: message.id.clone(),
        });
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let messages: Vec<MongoMessage> = self
            .messages
            .find(doc! { "thread_id": thread_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.notifier.subscribe()
    }
}
