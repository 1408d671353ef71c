//! SSE-style stream parsing for the agent streaming endpoint.
//!
//! The backend delivers a long-lived `text/event-stream`-shaped response
//! where each event is a single line:
//! - `data: <json>` - an event envelope payload
//! - `event: close` - server-side closure notice
//!
//! Chunks arrive at arbitrary byte boundaries, so parsing happens in two
//! stateful layers:
//! - `decode` - streaming-safe UTF-8 decoding that carries partial
//!   multi-byte sequences across chunk boundaries
//! - `parser` - line accumulation and [`StreamFrame`] emission
//!
//! # Module structure
//! - `frames` - frame type definitions (StreamFrame)
//! - `decode` - incremental UTF-8 decoder (Utf8StreamDecoder)
//! - `parser` - parsing logic (FrameParser, parse_stream_line)

mod decode;
mod frames;
mod parser;

pub use decode::Utf8StreamDecoder;
pub use frames::StreamFrame;
pub use parser::{parse_stream_line, FrameParser};
