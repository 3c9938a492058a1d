use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::buffer_utils::LineParser;
use crate::streaming::StreamEvent;

/// One NDJSON object of an `/api/chat` stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub model: String,
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    pub done_reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Parses `application/x-ndjson` bodies from Ollama's `/api/chat`
#[derive(Debug, Default, Clone, Copy)]
pub struct OllamaChatParser;

impl LineParser for OllamaChatParser {
    fn parse_line(&self, line: &str) -> Result<Vec<StreamEvent>> {
        let chunk: OllamaChatChunk = serde_json::from_str(line)
            .map_err(|e| anyhow::anyhow!("Failed to parse ollama chunk: {}", e))?;

        if let Some(error) = chunk.error {
            anyhow::bail!("Ollama error: {}", error);
        }

        let mut events = Vec::new();
        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                events.push(StreamEvent::message(message.content));
            }
        }
        if chunk.done {
            events.push(StreamEvent::done(chunk.done_reason));
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_line() {
        let line = r#"{"model":"deepseek-r1:1.5b","created_at":"2025-01-01T00:00:00Z","message":{"role":"assistant","content":"</think>"},"done":false}"#;
        let events = OllamaChatParser.parse_line(line).unwrap();
        assert_eq!(events, vec![StreamEvent::message("</think>")]);
    }

    #[test]
    fn test_final_line() {
        let line = r#"{"model":"m","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":12}"#;
        let events = OllamaChatParser.parse_line(line).unwrap();
        assert_eq!(events, vec![StreamEvent::done(Some("stop".to_string()))]);
    }

    #[test]
    fn test_error_line() {
        let err = OllamaChatParser
            .parse_line(r#"{"error":"model 'x' not found"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
