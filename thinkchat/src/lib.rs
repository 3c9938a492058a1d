//! # Thinkchat
//!
//! Chat with local reasoning models while keeping their reasoning apart
//! from their answers:
//! - **Streaming segmentation** of `<think>…</think>` output into a thought
//!   and a response, as fragments arrive
//! - **Persistent threads** in SQLite (default), MongoDB or memory
//! - **Change notification** and live queries over the store
//! - **Ollama and OpenAI-compatible** completion services
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use thinkchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = AppBuilder::new()
//!         .store(StoreConfig::Sqlite { path: "chat.db".into() })
//!         .provider(ProviderConfig::ollama())
//!         .build()
//!         .await?;
//!
//!     let thread = app.create_thread("Demo").await?;
//!     let reply = app.send(&thread.id, "Why is the sky blue?").await?;
//!
//!     if let Some(ViewEvent::Committed { .. }) = reply.finished().await {
//!         for message in app.history(&thread.id).await? {
//!             println!("[{}] {}", message.role.as_str(), message.content);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **thinkchat-types**: configs and view events
//! - **thinkchat-llm**: streaming completion clients (Ollama, OpenAI)
//! - **thinkchat-persist**: thread/message store, backends, notifications
//! - **thinkchat-chat**: stream segmenter and conversation view
//!
//! ## Features
//!
//! - `sqlite` (default): SQLite backend
//! - `mongodb`: MongoDB backend

// Re-export all public APIs
pub use thinkchat_types as types;
pub use thinkchat_chat as chat;
pub use thinkchat_llm as llm;
pub use thinkchat_persist as persist;

// Re-export commonly used types
pub use thinkchat_types::{ConversationConfig, LLMConfig, ViewEvent, StreamingDisplay};
pub use thinkchat_chat::{ConversationView, StreamSegmenter, Submission};
pub use thinkchat_llm::{ChatClient, ClientFactory, ProviderConfig};
pub use thinkchat_persist::{ChatStore, StoreConfig};

/// High-level builder wiring a store, a client and a view together
pub mod builder;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{AppBuilder, ChatApp};
    pub use crate::types::{
        ContextPolicy, ConversationConfig, LLMConfig, MarkerMode, PartialPolicy, Phase,
        StreamingDisplay, ViewEvent,
    };
    pub use crate::chat::{ChatError, Submission};
    pub use crate::llm::ProviderConfig;
    pub use crate::persist::{Message, MessageRole, StoreConfig, StoreEvent, Thread};
    pub use anyhow::Result;
}
