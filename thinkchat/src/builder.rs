//! High-level builder API for a chat application

use anyhow::{Context, Result};
use std::sync::Arc;
use thinkchat_chat::{ConversationView, Submission};
use thinkchat_llm::{ChatClient, ClientFactory, ProviderConfig};
use thinkchat_persist::{
    live_messages, live_threads, ChatStore, LiveQuery, Message, PersistClientBuilder, StoreConfig,
    Thread,
};
use thinkchat_types::ConversationConfig;

/// High-level builder for a [`ChatApp`]
///
/// # Example
///
/// ```rust,no_run
/// use thinkchat::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let app = AppBuilder::new()
///     .store(StoreConfig::Memory)
///     .provider(ProviderConfig::ollama_at("http://localhost:11434"))
///     .conversation(ConversationConfig::default().with_marker_mode(MarkerMode::Buffered))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct AppBuilder {
    store: StoreConfig,
    provider: ProviderConfig,
    conversation: ConversationConfig,
    client: Option<Arc<dyn ChatClient>>,
}

impl AppBuilder {
    /// SQLite store in `thinkchat.db`, local Ollama, default conversation settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, config: StoreConfig) -> Self {
        self.store = config;
        self
    }

    pub fn provider(mut self, config: ProviderConfig) -> Self {
        self.provider = config;
        self
    }

    /// Use an already built client instead of one from the provider config
    pub fn client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn conversation(mut self, config: ConversationConfig) -> Self {
        self.conversation = config;
        self
    }

    /// Open the store and create the client
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the client cannot
    /// be created.
    pub async fn build(self) -> Result<ChatApp> {
        let store = PersistClientBuilder::new()
            .config(self.store)
            .build()
            .await
            .context("Failed to open chat store")?;

        let client = match self.client {
            Some(client) => client,
            None => ClientFactory::create_client(self.provider)
                .context("Failed to create completion client")?,
        };

        let view = ConversationView::new(Arc::clone(&store), client, self.conversation);
        tracing::info!("chat app ready");

        Ok(ChatApp { store, view })
    }
}

/// A store and a conversation view ready to chat
pub struct ChatApp {
    store: Arc<dyn ChatStore>,
    view: ConversationView,
}

impl ChatApp {
    pub async fn create_thread(&self, title: &str) -> Result<Thread> {
        Ok(self.store.create_thread(title).await?)
    }

    /// All threads, most recently active first
    pub async fn threads(&self) -> Result<Vec<Thread>> {
        Ok(self.store.list_threads().await?)
    }

    pub async fn thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.store.get_thread(thread_id).await?)
    }

    /// Messages of a thread, oldest first
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>> {
        Ok(self.store.list_messages(thread_id).await?)
    }

    /// Persist `text` and start streaming the reply
    pub async fn send(&self, thread_id: &str, text: &str) -> Result<Submission> {
        Ok(self.view.submit(thread_id, text).await?)
    }

    pub fn watch_threads(&self) -> LiveQuery<Thread> {
        live_threads(Arc::clone(&self.store))
    }

    pub fn watch_messages(&self, thread_id: &str) -> LiveQuery<Message> {
        live_messages(Arc::clone(&self.store), thread_id)
    }

    /// Cancel the in-flight reply, if any, and refuse new ones
    pub fn shutdown(&self) {
        self.view.shutdown();
    }

    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }
}
