//! Stream envelope deserialization structs.
//!
//! Each `data:` frame carries a JSON envelope of the form
//! `{"type":"content","data":"{\"content\":\"...\"}"}` - the `data` field
//! is itself a JSON-encoded string. These structs decode both layers for
//! consumers that want typed access; the session layer itself stays
//! agnostic and only inspects the `type` discriminant.

use serde::Deserialize;

/// Wire-level discriminant of a stream envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeType {
    /// Incremental assistant text
    Content,
    /// Incremental thinking text, multiplexed with content on one session
    Reasoning,
    /// End-of-turn marker
    MessageEnd,
    /// Backend-reported failure
    Error,
    /// Anything this client does not recognize
    #[serde(other)]
    Unknown,
}

/// The envelope carried by every `data:` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    /// Embedded JSON string; empty for bare `message_end` envelopes
    #[serde(default)]
    pub data: String,
}

/// Embedded payload of `content` and `reasoning` envelopes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ContentDelta {
    /// Accepts "content", "text" or "data" for the delta field
    #[serde(default, alias = "text", alias = "data")]
    pub content: String,
}

/// Embedded payload of `error` envelopes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}
