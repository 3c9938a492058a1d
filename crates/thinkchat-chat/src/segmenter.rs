use anyhow::Result;
use futures::{Stream, StreamExt};
use thinkchat_llm::StreamEvent;
use thinkchat_types::{MarkerMode, Phase, StreamingDisplay};

const OPEN_MARKER: &str = "<think>";
const CLOSE_MARKER: &str = "</think>";
/// Prefix that ends the thinking phase in fragment mode
const CLOSE_PREFIX: &str = "</think";

/// What one fragment added to each buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentDelta {
    pub thought: String,
    pub response: String,
    /// Set on the fragment that moved the segmenter into [`Phase::Responding`]
    pub phase_changed: bool,
}

impl SegmentDelta {
    pub fn is_empty(&self) -> bool {
        self.thought.is_empty() && self.response.is_empty() && !self.phase_changed
    }
}

/// Final buffers of a finished stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    pub thought: String,
    pub response: String,
}

/// Splits streamed model output into reasoning and answer
///
/// Starts in [`Phase::Thinking`]. Once it reaches [`Phase::Responding`]
/// every later fragment goes to the response verbatim.
///
/// In [`MarkerMode::Fragment`] each fragment is classified on its own: a
/// fragment containing `<think>` or `</think` is structural and dropped, and
/// `</think` ends the thinking phase. Markers split across fragments are not
/// recognised, and text sharing a fragment with a marker is lost.
///
/// In [`MarkerMode::Buffered`] markers are matched against the accumulated
/// text. A trailing piece that could still grow into a marker is held back
/// until the next fragment (or [`flush`](Self::flush)) decides it.
#[derive(Debug, Clone)]
pub struct StreamSegmenter {
    mode: MarkerMode,
    phase: Phase,
    thought: String,
    response: String,
    pending: String,
}

impl StreamSegmenter {
    pub fn new(mode: MarkerMode) -> Self {
        Self {
            mode,
            phase: Phase::Thinking,
            thought: String::new(),
            response: String::new(),
            pending: String::new(),
        }
    }

    pub fn mode(&self) -> MarkerMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn thought(&self) -> &str {
        &self.thought
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    /// Current buffers, excluding any held-back tail
    pub fn snapshot(&self) -> StreamingDisplay {
        StreamingDisplay {
            thought: self.thought.clone(),
            response: self.response.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thought.is_empty() && self.response.is_empty() && self.pending.is_empty()
    }

    pub fn push(&mut self, fragment: &str) -> SegmentDelta {
        let mut delta = SegmentDelta::default();

        if self.phase == Phase::Responding {
            self.append_response(fragment, &mut delta);
            return delta;
        }

        match self.mode {
            MarkerMode::Fragment => self.push_fragment(fragment, &mut delta),
            MarkerMode::Buffered => self.push_buffered(fragment, &mut delta),
        }
        delta
    }

    /// Release the held-back tail into the current buffer
    pub fn flush(&mut self) -> SegmentDelta {
        let mut delta = SegmentDelta::default();
        let pending = std::mem::take(&mut self.pending);
        match self.phase {
            Phase::Thinking => self.append_thought(&pending, &mut delta),
            Phase::Responding => self.append_response(&pending, &mut delta),
        }
        delta
    }

    pub fn finish(mut self) -> Segments {
        self.flush();
        Segments {
            thought: self.thought,
            response: self.response,
        }
    }

    fn push_fragment(&mut self, fragment: &str, delta: &mut SegmentDelta) {
        let closes = fragment.contains(CLOSE_PREFIX);
        if !closes && !fragment.contains(OPEN_MARKER) {
            self.append_thought(fragment, delta);
        }
        if closes {
            self.enter_responding(delta);
        }
    }

    fn push_buffered(&mut self, fragment: &str, delta: &mut SegmentDelta) {
        let mut text = std::mem::take(&mut self.pending);
        text.push_str(fragment);
        let mut rest = text.as_str();

        loop {
            let open = rest.find(OPEN_MARKER);
            let close = rest.find(CLOSE_MARKER);

            match (open, close) {
                (_, Some(c)) if open.map_or(true, |o| c < o) => {
                    self.append_thought(&rest[..c], delta);
                    self.enter_responding(delta);
                    self.append_response(&rest[c + CLOSE_MARKER.len()..], delta);
                    return;
                }
                (Some(o), _) => {
                    self.append_thought(&rest[..o], delta);
                    rest = &rest[o + OPEN_MARKER.len()..];
                }
                _ => {
                    let held = marker_prefix_len(rest);
                    let split = rest.len() - held;
                    self.append_thought(&rest[..split], delta);
                    self.pending = rest[split..].to_string();
                    return;
                }
            }
        }
    }

    fn enter_responding(&mut self, delta: &mut SegmentDelta) {
        self.phase = Phase::Responding;
        delta.phase_changed = true;
    }

    fn append_thought(&mut self, text: &str, delta: &mut SegmentDelta) {
        self.thought.push_str(text);
        delta.thought.push_str(text);
    }

    fn append_response(&mut self, text: &str, delta: &mut SegmentDelta) {
        self.response.push_str(text);
        delta.response.push_str(text);
    }
}

impl Default for StreamSegmenter {
    fn default() -> Self {
        Self::new(MarkerMode::default())
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of a marker
fn marker_prefix_len(text: &str) -> usize {
    let max = text.len().min(CLOSE_MARKER.len() - 1);
    (1..=max)
        .rev()
        .find(|&len| {
            let start = text.len() - len;
            text.is_char_boundary(start) && {
                let tail = &text[start..];
                OPEN_MARKER.starts_with(tail) || CLOSE_MARKER.starts_with(tail)
            }
        })
        .unwrap_or(0)
}

/// Segment a completion stream, yielding one delta per fragment that
/// changed anything and a final one for the flushed tail.
///
/// Ends after `Done`, at the end of the input, or after the first error.
pub fn segment_stream<S>(stream: S, mode: MarkerMode) -> impl Stream<Item = Result<SegmentDelta>> + Send
where
    S: Stream<Item = Result<StreamEvent>> + Send + 'static,
{
    async_stream::stream! {
        let mut segmenter = StreamSegmenter::new(mode);
        let mut stream = Box::pin(stream);

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Message { content }) => {
                    let delta = segmenter.push(&content);
                    if !delta.is_empty() {
                        yield Ok(delta);
                    }
                }
                Ok(StreamEvent::Done { .. }) => break,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        let delta = segmenter.flush();
        if !delta.is_empty() {
            yield Ok(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mode: MarkerMode, fragments: &[&str]) -> Segments {
        let mut segmenter = StreamSegmenter::new(mode);
        for fragment in fragments {
            segmenter.push(fragment);
        }
        segmenter.finish()
    }

    #[test]
    fn test_reasoning_then_answer() {
        let fragments = ["<think>", "I am ", "reasoning", "</think>", "Hello", " world"];
        for mode in [MarkerMode::Fragment, MarkerMode::Buffered] {
            let segments = run(mode, &fragments);
            assert_eq!(segments.thought, "I am reasoning", "{mode:?}");
            assert_eq!(segments.response, "Hello world", "{mode:?}");
        }
    }

    #[test]
    fn test_no_markers_is_all_thought() {
        for mode in [MarkerMode::Fragment, MarkerMode::Buffered] {
            let segments = run(mode, &["just ", "some ", "text"]);
            assert_eq!(segments.thought, "just some text");
            assert!(segments.response.is_empty());
        }
    }

    #[test]
    fn test_no_fragments() {
        let segments = StreamSegmenter::default().finish();
        assert_eq!(segments, Segments::default());
    }

    #[test]
    fn test_phase_never_reverts() {
        let mut segmenter = StreamSegmenter::new(MarkerMode::Fragment);
        segmenter.push("</think>");
        assert_eq!(segmenter.phase(), Phase::Responding);

        let delta = segmenter.push("<think>again</think>");
        assert_eq!(segmenter.phase(), Phase::Responding);
        assert!(!delta.phase_changed);
        assert_eq!(segmenter.response(), "<think>again</think>");
    }

    #[test]
    fn test_fragment_mode_drops_marker_fragments_whole() {
        let segments = run(MarkerMode::Fragment, &["<think>intro", " body ", "end</think>\n\n", "Answer"]);
        assert_eq!(segments.thought, " body ");
        assert_eq!(segments.response, "Answer");
    }

    #[test]
    fn test_fragment_mode_close_prefix_without_bracket() {
        let mut segmenter = StreamSegmenter::new(MarkerMode::Fragment);
        segmenter.push("thinking");
        let delta = segmenter.push("</think");
        assert!(delta.phase_changed);
        assert!(delta.thought.is_empty());
        segmenter.push(">done");
        assert_eq!(segmenter.response(), ">done");
    }

    #[test]
    fn test_fragment_mode_misses_split_marker() {
        let segments = run(MarkerMode::Fragment, &["a", "</th", "ink>", "b"]);
        assert_eq!(segments.thought, "a</think>b");
        assert!(segments.response.is_empty());
    }

    #[test]
    fn test_buffered_mode_split_markers() {
        let segments = run(MarkerMode::Buffered, &["<th", "ink>plan", " it</th", "ink>", "Do it"]);
        assert_eq!(segments.thought, "plan it");
        assert_eq!(segments.response, "Do it");
    }

    #[test]
    fn test_buffered_mode_keeps_text_around_markers() {
        let segments = run(MarkerMode::Buffered, &["<think>why</think>because"]);
        assert_eq!(segments.thought, "why");
        assert_eq!(segments.response, "because");
    }

    #[test]
    fn test_buffered_mode_holds_back_possible_marker() {
        let mut segmenter = StreamSegmenter::new(MarkerMode::Buffered);
        let delta = segmenter.push("a <");
        assert_eq!(delta.thought, "a ");
        assert_eq!(segmenter.thought(), "a ");

        let delta = segmenter.push("b");
        assert_eq!(delta.thought, "<b");

        segmenter.push("x </thi");
        assert_eq!(segmenter.thought(), "a <bx ");
        let flushed = segmenter.flush();
        assert_eq!(flushed.thought, "</thi");
        assert_eq!(segmenter.phase(), Phase::Thinking);
    }

    #[test]
    fn test_buffered_mode_multibyte_text() {
        let segments = run(MarkerMode::Buffered, &["<think>héllo ", "wörld</think>", "ünïcode"]);
        assert_eq!(segments.thought, "héllo wörld");
        assert_eq!(segments.response, "ünïcode");
    }

    #[test]
    fn test_delta_matches_buffers() {
        let mut segmenter = StreamSegmenter::new(MarkerMode::Buffered);
        let mut thought = String::new();
        let mut response = String::new();
        for fragment in ["<think>", "one ", "two</think>", "three"] {
            let delta = segmenter.push(fragment);
            thought.push_str(&delta.thought);
            response.push_str(&delta.response);
        }
        assert_eq!(thought, segmenter.thought());
        assert_eq!(response, segmenter.response());
        assert_eq!(segmenter.snapshot().response, "three");
    }

    #[tokio::test]
    async fn test_segment_stream_stops_at_done() {
        let events = vec![
            Ok(StreamEvent::message("<think>")),
            Ok(StreamEvent::message("hmm")),
            Ok(StreamEvent::message("</think>")),
            Ok(StreamEvent::message("ok")),
            Ok(StreamEvent::done(Some("stop".to_string()))),
            Ok(StreamEvent::message("ignored")),
        ];

        let deltas: Vec<SegmentDelta> = segment_stream(futures::stream::iter(events), MarkerMode::Fragment)
            .map(|d| d.unwrap())
            .collect()
            .await;

        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas[0].thought, "hmm");
        assert!(deltas[1].phase_changed);
        assert_eq!(deltas[2].response, "ok");
    }

    #[tokio::test]
    async fn test_segment_stream_propagates_error() {
        let events = vec![
            Ok(StreamEvent::message("partial")),
            Err(anyhow::anyhow!("connection reset")),
            Ok(StreamEvent::message("never")),
        ];

        let results: Vec<Result<SegmentDelta>> =
            segment_stream(futures::stream::iter(events), MarkerMode::Fragment).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }
}
