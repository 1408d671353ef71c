//! Reply collection: accumulate one full assistant turn from a stream.
//!
//! `content` and `reasoning` envelopes are two logical sub-streams
//! multiplexed on one session, so they accumulate independently. The
//! collector resolves on the end-of-turn marker (or the terminal close
//! notice), surfaces backend `error` envelopes as typed errors, and closes
//! the handle on every exit path - closing is idempotent, so this is safe
//! even after natural completion.

use tokio::sync::mpsc;

use crate::agent::events::{AgentEvent, EventKind};
use crate::agent::payloads::{ContentDelta, EnvelopeType, ErrorDetail, StreamEnvelope};
use crate::agent::session::StreamHandle;
use crate::error::AgentError;

/// Accumulated text of one assistant turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    /// Concatenation of every content delta, in arrival order
    pub content: String,
    /// Concatenation of every reasoning delta, in arrival order
    pub reasoning: String,
}

enum Update {
    Message(AgentEvent),
    Error(String),
    Close,
}

/// Drive a stream handle to completion, accumulating the reply.
///
/// `on_progress` is invoked with the full content accumulated so far after
/// each content delta. A stream that never produces a terminal frame keeps
/// this future pending - the session defines no intrinsic timeout, so
/// callers needing bounded latency should race this against their own timer
/// and call [`StreamHandle::close`].
pub async fn collect_reply(
    handle: &StreamHandle,
    mut on_progress: impl FnMut(&str),
) -> Result<AssistantReply, AgentError> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let message_tx = tx.clone();
    let message_id = handle.add_event_listener(EventKind::Message, move |event| {
        let _ = message_tx.send(Update::Message(event.clone()));
    });
    let error_tx = tx.clone();
    let error_id = handle.add_event_listener(EventKind::Error, move |event| {
        let message = match event {
            AgentEvent::Raw(text) => text.clone(),
            AgentEvent::Json(value) => value.to_string(),
        };
        let _ = error_tx.send(Update::Error(message));
    });
    let close_id = handle.add_event_listener(EventKind::Close, move |_| {
        let _ = tx.send(Update::Close);
    });

    let mut reply = AssistantReply::default();
    let result = loop {
        let Some(update) = rx.recv().await else {
            // All senders dropped with the listeners - cannot happen while
            // they are still registered, but do not hang if it does
            break Err(AgentError::Stream {
                message: "stream dispatcher went away".to_string(),
            });
        };
        match update {
            Update::Message(event) => match envelope_of(&event) {
                Some(envelope) => match envelope.kind {
                    EnvelopeType::Content => {
                        if let Some(delta) = delta_of(&envelope.data) {
                            reply.content.push_str(&delta.content);
                            on_progress(&reply.content);
                        }
                    }
                    EnvelopeType::Reasoning => {
                        if let Some(delta) = delta_of(&envelope.data) {
                            reply.reasoning.push_str(&delta.content);
                        }
                    }
                    EnvelopeType::MessageEnd => break Ok(std::mem::take(&mut reply)),
                    EnvelopeType::Error => {
                        let message = serde_json::from_str::<ErrorDetail>(&envelope.data)
                            .ok()
                            .map(|detail| detail.message)
                            .filter(|message| !message.is_empty())
                            .unwrap_or_else(|| "unknown backend error".to_string());
                        break Err(AgentError::Backend { message });
                    }
                    EnvelopeType::Unknown => {}
                },
                None => {
                    tracing::debug!("ignoring stream message without a typed envelope");
                }
            },
            Update::Error(message) => break Err(AgentError::Stream { message }),
            Update::Close => break Ok(std::mem::take(&mut reply)),
        }
    };

    handle.remove_event_listener(EventKind::Message, message_id);
    handle.remove_event_listener(EventKind::Error, error_id);
    handle.remove_event_listener(EventKind::Close, close_id);
    handle.close();

    result
}

fn envelope_of(event: &AgentEvent) -> Option<StreamEnvelope> {
    match event {
        AgentEvent::Json(value) => serde_json::from_value(value.clone()).ok(),
        AgentEvent::Raw(_) => None,
    }
}

fn delta_of(data: &str) -> Option<ContentDelta> {
    match serde_json::from_str(data) {
        Ok(delta) => Some(delta),
        Err(e) => {
            tracing::debug!(error = %e, "undecodable delta payload, skipping");
            None
        }
    }
}
