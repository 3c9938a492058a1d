pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod openai;
pub mod ollama;
pub mod config;

pub use traits::{ChatClient, ChatRequest, ChatResponse, ChatOptions, EventStream};
pub use streaming::StreamEvent;
pub use buffer_utils::{CircularLineBuffer, LineParser, parse_line_stream};
pub use openai::OpenAIClient;
pub use ollama::OllamaClient;
pub use config::{ClientFactory, ProviderConfig, ProviderType, OllamaConfig, OpenAIConfig};
pub use types::Message;
