//! Incremental UTF-8 decoding for streamed response bytes.
//!
//! Network chunks can split a multi-byte UTF-8 sequence anywhere. The
//! decoder keeps the incomplete trailing bytes of each chunk and prepends
//! them to the next one, so the text handed to the line parser is always
//! well-formed. Invalid sequences are replaced rather than treated as fatal.

/// Streaming UTF-8 decoder that preserves partial multi-byte sequences
/// across chunk boundaries.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Trailing bytes of the previous chunk that did not complete a sequence
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a new decoder with no pending bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all complete characters.
    ///
    /// An incomplete multi-byte sequence at the end of the chunk is held
    /// back until the next call. Invalid byte sequences become
    /// `U+FFFD REPLACEMENT CHARACTER`.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let keep = incomplete_suffix_len(&bytes);
        let split = bytes.len() - keep;
        self.pending = bytes[split..].to_vec();
        String::from_utf8_lossy(&bytes[..split]).into_owned()
    }

    /// Flush any bytes still pending at end of stream.
    ///
    /// A sequence that never completed is invalid by definition and decodes
    /// to a single replacement character.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Number of trailing bytes that start, but do not complete, a UTF-8
/// sequence. At most 3 bytes can be held back (a 4-byte sequence missing
/// its last byte).
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let start = len.saturating_sub(3);
    for i in (start..len).rev() {
        let b = bytes[i];
        if b < 0x80 {
            // ASCII - nothing pending
            return 0;
        }
        if b >= 0xC0 {
            // Lead byte: how long should this sequence be?
            let need = if b >= 0xF0 {
                4
            } else if b >= 0xE0 {
                3
            } else {
                2
            };
            let have = len - i;
            return if have < need { have } else { 0 };
        }
        // Continuation byte - keep scanning backwards
    }
    0
}
