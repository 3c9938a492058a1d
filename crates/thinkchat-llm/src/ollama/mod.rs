mod client;
mod stream;

pub use client::OllamaClient;
pub use stream::{OllamaChatChunk, OllamaChatParser};
