use anyhow::Result;
use futures::{Stream, StreamExt};
use std::fmt::Display;

use super::buffering::CircularLineBuffer;
use crate::streaming::StreamEvent;
use crate::traits::EventStream;

/// Strategy for turning one line of a streamed body into events
///
/// SSE bodies (OpenAI-compatible servers) and NDJSON bodies (Ollama) share
/// the same line framing and differ only in how a line is decoded.
pub trait LineParser: Send {
    /// Parse a complete line (terminator already stripped) into events.
    /// Lines that carry nothing (keep-alives, comments) yield an empty vec.
    fn parse_line(&self, line: &str) -> Result<Vec<StreamEvent>>;
}

/// Generic line-framed stream parser using a circular buffer
///
/// The returned stream ends after the first `Done` event, after the first
/// error, or when the body ends.
pub fn parse_line_stream<S, B, E, P>(body: S, parser: P) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    P: LineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(body);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut finished = false;

        'body: while let Some(chunk_result) = byte_chunks.next().await {
            let bytes = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    finished = true;
                    break 'body;
                }
            };
            buffer.extend(bytes.as_ref());

            while let Some(line_result) = buffer.next_line() {
                let events = line_result.and_then(|line| parse_non_empty(&parser, &line));
                match events {
                    Ok(events) => {
                        for event in events {
                            let done = event.is_done();
                            yield Ok(event);
                            if done {
                                finished = true;
                                break 'body;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        finished = true;
                        break 'body;
                    }
                }
            }
        }

        // Body ended without a terminator on its last line
        if !finished {
            if let Some(line_result) = buffer.take_remaining() {
                match line_result.and_then(|line| parse_non_empty(&parser, &line)) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        }
    })
}

fn parse_non_empty<P: LineParser>(parser: &P, line: &str) -> Result<Vec<StreamEvent>> {
    if line.trim().is_empty() {
        return Ok(Vec::new());
    }
    parser.parse_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct PlainParser;

    impl LineParser for PlainParser {
        fn parse_line(&self, line: &str) -> Result<Vec<StreamEvent>> {
            match line {
                "END" => Ok(vec![StreamEvent::done(None)]),
                "BAD" => anyhow::bail!("bad line"),
                other => Ok(vec![StreamEvent::message(other)]),
            }
        }
    }

    type Chunk = std::result::Result<&'static [u8], String>;

    fn ok(text: &'static str) -> Chunk {
        Ok(text.as_bytes())
    }

    async fn collect(chunks: Vec<Chunk>) -> Vec<Result<StreamEvent>> {
        parse_line_stream(stream::iter(chunks), PlainParser).collect().await
    }

    #[tokio::test]
    async fn test_stops_at_done() {
        let events = collect(vec![ok("a\nb"), ok("\nEND\nc\n")]).await;
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::message("a"),
                StreamEvent::message("b"),
                StreamEvent::done(None),
            ]
        );
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_parsed() {
        let events = collect(vec![ok("\n\nlast")]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &StreamEvent::message("last"));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let events = collect(vec![ok("a\n"), Err("connection reset".to_string()), ok("b\n")]).await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        let err = events[1].as_ref().unwrap_err().to_string();
        assert!(err.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_parse_error_ends_stream() {
        let events = collect(vec![ok("BAD\na\n")]).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }
}
