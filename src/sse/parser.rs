//! Stream framing logic
//!
//! Contains the stateful FrameParser that accumulates decoded text chunks,
//! splits them into logical lines and emits complete [`StreamFrame`]s.

use crate::sse::frames::StreamFrame;

/// Parse a single logical line into a frame, if it carries one.
///
/// Two line shapes are meaningful:
/// - `data: <payload>` - emits [`StreamFrame::Data`] when the payload is
///   non-empty after trimming
/// - `event: <name>` where the name contains `close` - emits
///   [`StreamFrame::EventClose`]
///
/// Everything else (blank lines, comments, unknown prefixes) is ignored.
pub fn parse_stream_line(line: &str) -> Option<StreamFrame> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix("data: ") {
        let payload = rest.trim();
        if payload.is_empty() {
            return None;
        }
        return Some(StreamFrame::Data(payload.to_string()));
    }

    if let Some(rest) = trimmed.strip_prefix("event: ") {
        if rest.contains("close") {
            return Some(StreamFrame::EventClose);
        }
    }

    None
}

/// Stateful frame parser that accumulates chunks and emits complete frames.
///
/// Chunks may split lines (and even the `data: ` prefix itself) at arbitrary
/// positions; the parser buffers the trailing partial line between calls.
/// Frames come out in wire order, never split and never duplicated,
/// regardless of how the input was chunked.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Trailing partial line carried over from the previous chunk
    buffer: String,
}

impl FrameParser {
    /// Create a new frame parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded text chunk, returning all frames completed by it.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<StreamFrame> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline_pos).collect();
            if let Some(frame) = parse_stream_line(line.trim_end_matches(['\n', '\r'])) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush the buffer at end of stream.
    ///
    /// A final `data:` line without a trailing newline must not be lost, so
    /// any leftover text runs through the same per-line logic.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        let remainder = std::mem::take(&mut self.buffer);
        if remainder.trim().is_empty() {
            return Vec::new();
        }
        remainder
            .split('\n')
            .filter_map(|line| parse_stream_line(line.trim_end_matches('\r')))
            .collect()
    }
}
