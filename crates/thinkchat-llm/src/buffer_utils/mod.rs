mod buffering;
mod line_parser;

pub use buffering::CircularLineBuffer;
pub use line_parser::{LineParser, parse_line_stream};
