pub mod segmenter;
pub mod conversation;
pub mod builder;
pub mod error;

pub use segmenter::{segment_stream, SegmentDelta, Segments, StreamSegmenter};
pub use conversation::{ConversationView, Submission};
pub use builder::ConversationViewBuilder;
pub use error::ChatError;

// Re-export key types from thinkchat-types
pub use thinkchat_types::{
    ContextPolicy, ConversationConfig, LLMConfig, MarkerMode, PartialPolicy, Phase,
    StreamingDisplay, ViewEvent,
};
