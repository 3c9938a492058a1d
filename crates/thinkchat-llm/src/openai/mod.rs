mod client;
mod stream;

pub use client::OpenAIClient;
pub use stream::{ChatCompletionsParser, ChatStreamChunk};
