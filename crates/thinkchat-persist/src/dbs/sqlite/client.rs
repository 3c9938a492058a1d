use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::schema;
use crate::clock::MonotonicClock;
use crate::error::{PersistError, Result};
use crate::models::{Message, NewMessage, Thread};
use crate::notify::{ChangeNotifier, StoreEvent};
use crate::store::ChatStore;

/// Single-file store backed by SQLite
///
/// The connection sits behind a mutex and every call runs on the blocking
/// pool, so writes are serialized and the async runtime never waits on disk.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<MonotonicClock>,
    notifier: ChangeNotifier,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), "opening sqlite store");

        let conn = tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PersistError::Connection(format!("{}: {e}", parent.display())))?;
            }
            Connection::open(&path).map_err(PersistError::from)
        })
        .await
        .map_err(|e| PersistError::Internal(format!("blocking task failed: {e}")))??;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::migrate(&conn)?;
        let latest = schema::latest_timestamp_ms(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(MonotonicClock::starting_after(latest)),
            notifier: ChangeNotifier::new(),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &MonotonicClock) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let clock = Arc::clone(&self.clock);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| PersistError::Internal("sqlite connection lock poisoned".to_string()))?;
            f(&mut guard, &clock)
        })
        .await
        .map_err(|e| PersistError::Internal(format!("blocking task failed: {e}")))?
    }
}

fn load_thread(conn: &Connection, thread_id: &str) -> Result<Option<Thread>> {
    let doc: Option<String> = conn
        .query_row("SELECT doc FROM threads WHERE id = ?1", params![thread_id], |row| row.get(0))
        .optional()?;

    doc.map(|doc| serde_json::from_str(&doc).map_err(PersistError::from))
        .transpose()
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let title = title.to_string();
        let thread = self
            .with_conn(move |conn, clock| {
                let thread = Thread::new(title, clock.now());
                conn.execute(
                    "INSERT INTO threads (id, created_at, updated_at, doc) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        thread.id,
                        thread.created_at.timestamp_millis(),
                        thread.updated_at.timestamp_millis(),
                        serde_json::to_string(&thread)?,
                    ],
                )?;
                Ok(thread)
            })
            .await?;

        tracing::debug!(thread_id = %thread.id, "thread created");
        self.notifier.notify(StoreEvent::ThreadCreated {
            thread_id: thread.id.clone(),
        });
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn, _| load_thread(conn, &thread_id)).await
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        self.with_conn(|conn, _| {
            let mut stmt = conn.prepare("SELECT doc FROM threads ORDER BY updated_at DESC")?;
            let docs = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            docs.iter()
                .map(|doc| serde_json::from_str(doc).map_err(PersistError::from))
                .collect()
        })
        .await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message> {
        let message = self
            .with_conn(move |conn, clock| {
                let tx = conn.transaction()?;

                // Dropping `tx` on the early return rolls back
                let mut thread = load_thread(&tx, &message.thread_id)?
                    .ok_or_else(|| PersistError::ThreadNotFound(message.thread_id.clone()))?;

                let now = clock.now();
                thread.updated_at = now;
                let message = message.into_message(now);

                tx.execute(
                    "UPDATE threads SET updated_at = ?2, doc = ?3 WHERE id = ?1",
                    params![thread.id, now.timestamp_millis(), serde_json::to_string(&thread)?],
                )?;
                tx.execute(
                    "INSERT INTO messages (id, thread_id, created_at, doc) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        message.id,
                        message.thread_id,
                        now.timestamp_millis(),
                        serde_json::to_string(&message)?,
                    ],
                )?;
                tx.commit()?;
                Ok(message)
            })
            .await?;

        tracing::debug!(thread_id = %message.thread_id, message_id = %message.id, "message appended");
        self.notifier.notify(StoreEvent::MessageAppended {
            thread_id: message.thread_id.clone(),
            message_id: message.id.clone(),
        });
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn, _| {
            let mut stmt = conn.prepare(
                "SELECT doc FROM messages WHERE thread_id = ?1 ORDER BY created_at ASC",
            )?;
            let docs = stmt
                .query_map(params![thread_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            docs.iter()
                .map(|doc| serde_json::from_str(doc).map_err(PersistError::from))
                .collect()
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.notifier.subscribe()
    }
}
