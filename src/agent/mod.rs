//! Agent stream session: request lifecycle, frame interpretation and
//! subscriber dispatch.
//!
//! # Module structure
//! - `client` - HTTP client for the agent endpoints (AgentClient)
//! - `session` - session lifecycle, listener registry, dispatch (StreamHandle)
//! - `events` - dispatch categories and event payloads (EventKind, AgentEvent)
//! - `payloads` - wire envelope deserialization structs
//! - `collector` - full-turn accumulation (collect_reply, AssistantReply)

mod client;
mod collector;
mod events;
mod payloads;
mod session;

pub use client::{AgentClient, DEFAULT_BASE_URL};
pub use collector::{collect_reply, AssistantReply};
pub use events::{AgentEvent, EventKind};
pub use payloads::{ContentDelta, EnvelopeType, ErrorDetail, StreamEnvelope};
pub use session::{
    ListenerId, SessionState, StreamHandle, DEFAULT_CLOSE_GRACE, END_OF_TURN_MARKER,
};

use chrono::Utc;
use uuid::Uuid;

/// Generate a session id of the form `<namespace>_<unix-millis>_<suffix>`.
///
/// Unique per call; used only for backend correlation and never reused
/// across retries.
pub fn new_session_id(namespace: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        namespace,
        Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = new_session_id("ailearn");
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ailearn");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = new_session_id("ailearn");
        let b = new_session_id("ailearn");
        assert_ne!(a, b);
    }

    #[test]
    fn test_namespace_with_underscores_keeps_prefix() {
        let id = new_session_id("ailearn_chat");
        assert!(id.starts_with("ailearn_chat_"));
    }
}
