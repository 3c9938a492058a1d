pub mod config;
pub mod events;

pub use config::{ContextPolicy, ConversationConfig, LLMConfig, MarkerMode, PartialPolicy};
pub use events::{Phase, StreamingDisplay, ViewEvent};
