use anyhow::Result;
use std::collections::VecDeque;

/// Circular buffer for line-framed streaming bodies
///
/// Network chunks rarely line up with protocol lines (SSE `data:` lines,
/// NDJSON objects, multi-byte UTF-8 characters), so bytes are queued here
/// and only complete lines are handed out.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next complete line (up to `\n`), without the line terminator.
    /// Returns None if no complete line is available.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode_line(&line_bytes))
    }

    /// Drain whatever is left once the body has ended.
    /// A final line without a trailing newline is still a line.
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode_line(&line_bytes))
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> Result<String> {
    let line = std::str::from_utf8(bytes)
        .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in stream line: {}", e))?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"data: {\"a\"");
        assert!(buffer.next_line().is_none());

        buffer.extend(b":1}\r\ndata: [DONE]\n");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "data: {\"a\":1}");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "data: [DONE]");
        assert!(buffer.next_line().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut buffer = CircularLineBuffer::with_capacity(16);
        let text = "olá\n".as_bytes();

        buffer.extend(&text[..3]);
        assert!(buffer.next_line().is_none());
        buffer.extend(&text[3..]);
        assert_eq!(buffer.next_line().unwrap().unwrap(), "olá");
    }

    #[test]
    fn test_take_remaining_returns_unterminated_line() {
        let mut buffer = CircularLineBuffer::with_capacity(16);
        buffer.extend(b"{\"done\":true}");

        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.len(), 13);
        assert_eq!(buffer.take_remaining().unwrap().unwrap(), "{\"done\":true}");
        assert!(buffer.take_remaining().is_none());
    }
}
