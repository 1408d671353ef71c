//! Dispatch event types for the agent stream session.
//!
//! The session translates wire frames into dispatches on a closed set of
//! event kinds. The wire-level `type` discriminant (`content`, `reasoning`,
//! `message_end`, `error`) lives *inside* the payload; the dispatch kind
//! is the delivery category, not the wire name.

use serde_json::Value;

/// Delivery category for subscriber dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Every `data:` frame produces exactly one Message dispatch
    Message,
    /// Transport-level failure (never fired after an intentional close)
    Error,
    /// Terminal notice after the scheduled grace close
    Close,
}

/// The unit delivered to subscribers.
///
/// A payload that fails strict JSON parsing degrades to [`AgentEvent::Raw`]
/// so that no frame is ever silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Successfully parsed JSON payload
    Json(Value),
    /// Raw string fallback (unparseable payload, or an error description)
    Raw(String),
}

impl AgentEvent {
    /// Borrow the parsed JSON payload, if this event carries one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            AgentEvent::Json(value) => Some(value),
            AgentEvent::Raw(_) => None,
        }
    }

    /// Borrow the raw string payload, if this event carries one.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            AgentEvent::Json(_) => None,
            AgentEvent::Raw(text) => Some(text),
        }
    }
}
