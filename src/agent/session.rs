//! Agent stream session lifecycle and subscriber dispatch.
//!
//! One session owns one outbound streaming request. Frames parsed from the
//! response feed [`SessionShared::process_frame`], which dispatches
//! [`AgentEvent`]s to registered listeners:
//!
//! - every `data:` frame produces exactly one `Message` dispatch (parsed
//!   JSON, or the raw string when parsing fails)
//! - the end-of-turn marker and `event: close` both schedule a cancellable
//!   grace-period close, after which a single `Close` dispatch fires
//! - transport failures produce a single `Error` dispatch, unless the
//!   session was already closed intentionally
//!
//! State machine: `Idle -> Connecting -> Streaming -> {Completed | Errored |
//! Cancelled}`. All terminal transitions race through one atomic latch, so
//! exactly one of them wins and nothing is dispatched afterwards (the
//! winning transition's own dispatch excepted).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;

use crate::agent::events::{AgentEvent, EventKind};
use crate::sse::{FrameParser, StreamFrame, Utf8StreamDecoder};

/// Wire discriminant that marks the end of the model's turn.
pub const END_OF_TURN_MARKER: &str = "message_end";

/// Default grace period between the end-of-turn marker (or a server close
/// notice) and the actual transport shutdown. Lets listeners observe the
/// terminal payload before the session stops dispatching.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(100);

/// Lifecycle state of one streaming exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, request not yet sent
    Idle,
    /// Request sent, response headers not yet received
    Connecting,
    /// Response accepted, frames flowing
    Streaming,
    /// Terminal: end-of-turn marker or transport end-of-stream
    Completed,
    /// Terminal: transport failure
    Errored,
    /// Terminal: explicit close() before completion
    Cancelled,
}

impl SessionState {
    /// Whether this state absorbs all further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Errored | SessionState::Cancelled
        )
    }
}

/// Callback registered for one event kind.
pub type EventListener = Box<dyn FnMut(&AgentEvent) + Send>;

/// Token returned by [`StreamHandle::add_event_listener`], used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-session listener registry: one ordered list per event kind.
/// Insertion order is invocation order.
#[derive(Default)]
struct ListenerRegistry {
    message: Vec<(ListenerId, EventListener)>,
    error: Vec<(ListenerId, EventListener)>,
    close: Vec<(ListenerId, EventListener)>,
}

impl ListenerRegistry {
    fn slot_mut(&mut self, kind: EventKind) -> &mut Vec<(ListenerId, EventListener)> {
        match kind {
            EventKind::Message => &mut self.message,
            EventKind::Error => &mut self.error,
            EventKind::Close => &mut self.close,
        }
    }
}

/// State shared between the handle, the drive task and the grace-close task.
pub(crate) struct SessionShared {
    session_id: String,
    registry: Mutex<ListenerRegistry>,
    /// Shutdown latch: once set, no further events are dispatched and the
    /// drive task winds down at its next check.
    cancelled: AtomicBool,
    state: Mutex<SessionState>,
    next_listener_id: AtomicU64,
    close_grace: Duration,
}

impl SessionShared {
    pub(crate) fn new(session_id: String, close_grace: Duration) -> Self {
        Self {
            session_id,
            registry: Mutex::new(ListenerRegistry::default()),
            cancelled: AtomicBool::new(false),
            state: Mutex::new(SessionState::Idle),
            next_listener_id: AtomicU64::new(1),
            close_grace,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Advance to a non-terminal state, unless the session already shut down.
    fn advance(&self, state: SessionState) {
        let mut current = self.state.lock().unwrap();
        if !self.is_cancelled() && !current.is_terminal() {
            *current = state;
        }
    }

    /// Claim the dispatch latch and move to a terminal state. Returns true
    /// for exactly one caller; everyone else finds the latch already set.
    /// An earlier terminal state is never downgraded (a `Completed` session
    /// stays `Completed` when it is closed afterwards).
    fn shutdown_to(&self, state: SessionState) -> bool {
        let mut current = self.state.lock().unwrap();
        let already = self.cancelled.swap(true, Ordering::SeqCst);
        if !current.is_terminal() {
            *current = state;
        }
        !already
    }

    /// Dispatch to all listeners of a kind, in registration order.
    fn dispatch(&self, kind: EventKind, event: &AgentEvent) {
        let mut registry = self.registry.lock().unwrap();
        for (_, listener) in registry.slot_mut(kind).iter_mut() {
            listener(event);
        }
    }

    /// Dispatch unless the session already shut down.
    fn dispatch_checked(&self, kind: EventKind, event: &AgentEvent) {
        if self.is_cancelled() {
            return;
        }
        self.dispatch(kind, event);
    }

    /// Translate one wire frame into dispatches.
    pub(crate) fn process_frame(self: &Arc<Self>, frame: StreamFrame) {
        if self.is_cancelled() {
            return;
        }
        match frame {
            StreamFrame::Data(payload) => match serde_json::from_str::<Value>(&payload) {
                Ok(value) => {
                    let end_of_turn =
                        value.get("type").and_then(Value::as_str) == Some(END_OF_TURN_MARKER);
                    self.dispatch_checked(EventKind::Message, &AgentEvent::Json(value));
                    if end_of_turn {
                        self.schedule_close();
                    }
                }
                Err(e) => {
                    // Unparseable payloads degrade to the raw string
                    tracing::debug!(
                        session_id = %self.session_id,
                        error = %e,
                        "frame payload is not JSON, delivering raw string"
                    );
                    self.dispatch_checked(EventKind::Message, &AgentEvent::Raw(payload));
                }
            },
            StreamFrame::EventClose => self.schedule_close(),
        }
    }

    /// Schedule the deferred close. The delay is cancellable: an explicit
    /// `close()` in the meantime wins the latch and the deferred dispatch
    /// never fires.
    fn schedule_close(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(shared.close_grace).await;
            if shared.shutdown_to(SessionState::Completed) {
                tracing::debug!(session_id = %shared.session_id, "stream completed");
                shared.dispatch(EventKind::Close, &AgentEvent::Json(Value::Object(Default::default())));
            }
        });
    }

    /// Transport-level failure. Swallowed if the session was already closed.
    pub(crate) fn fail(&self, message: String) {
        if self.shutdown_to(SessionState::Errored) {
            tracing::warn!(session_id = %self.session_id, error = %message, "stream failed");
            self.dispatch(EventKind::Error, &AgentEvent::Raw(message));
        }
    }

    /// Natural end of stream. Moves to `Completed` without claiming the
    /// dispatch latch: a grace close scheduled by a just-processed terminal
    /// frame must still get to fire its `Close` dispatch.
    pub(crate) fn complete(&self) {
        let mut current = self.state.lock().unwrap();
        if !self.is_cancelled() && !current.is_terminal() {
            *current = SessionState::Completed;
            tracing::debug!(session_id = %self.session_id, "stream ended");
        }
    }
}

/// Handle to one open streaming exchange.
///
/// The caller exclusively owns the handle. Dropping it does *not* abort the
/// exchange; call [`StreamHandle::close`] to cancel. Closing is idempotent
/// and safe after natural completion.
pub struct StreamHandle {
    shared: Arc<SessionShared>,
}

impl StreamHandle {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self { shared }
    }

    /// The generated session id used for backend correlation.
    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Register a callback for one event kind.
    ///
    /// Safe to call before or after the stream starts. Listeners for the
    /// same kind run in registration order. A listener must not register or
    /// remove listeners on the same handle from inside its own callback;
    /// calling [`StreamHandle::close`] from a callback is fine.
    pub fn add_event_listener(
        &self,
        kind: EventKind,
        listener: impl FnMut(&AgentEvent) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.shared.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.shared
            .registry
            .lock()
            .unwrap()
            .slot_mut(kind)
            .push((id, Box::new(listener)));
        id
    }

    /// Unregister a callback. A no-op if the id was never registered (or was
    /// registered for a different kind).
    pub fn remove_event_listener(&self, kind: EventKind, id: ListenerId) {
        self.shared
            .registry
            .lock()
            .unwrap()
            .slot_mut(kind)
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Close the session: trigger the shutdown latch and suppress all
    /// further dispatch, including the `Error` event the aborted transport
    /// would otherwise produce. Idempotent.
    pub fn close(&self) {
        if self.shared.shutdown_to(SessionState::Cancelled) {
            tracing::debug!(session_id = %self.shared.session_id, "stream closed by caller");
        }
    }
}

/// Drive one streaming response to completion.
///
/// Sends the request, then pumps the byte stream through the UTF-8 decoder
/// and the frame parser, checking the shutdown latch before every read and
/// every dispatch. On end-of-stream the parser is flushed so a final
/// unterminated `data:` line is not lost.
pub(crate) async fn drive_stream(shared: Arc<SessionShared>, request: reqwest::RequestBuilder) {
    shared.advance(SessionState::Connecting);

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            shared.fail(format!("Request failed: {}", e));
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status().as_u16();
        shared.fail(format!("Request failed with status: {}", status));
        return;
    }

    shared.advance(SessionState::Streaming);

    let mut bytes_stream = response.bytes_stream();
    let mut decoder = Utf8StreamDecoder::new();
    let mut parser = FrameParser::new();

    while !shared.is_cancelled() {
        match bytes_stream.next().await {
            Some(Ok(chunk)) => {
                for frame in parser.push_chunk(&decoder.decode(&chunk)) {
                    shared.process_frame(frame);
                    if shared.is_cancelled() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                shared.fail(format!("Stream read failed: {}", e));
                return;
            }
            None => {
                // End of stream: flush the decoder, then the line buffer
                let tail = decoder.flush();
                let mut frames = parser.push_chunk(&tail);
                frames.extend(parser.finish());
                for frame in frames {
                    shared.process_frame(frame);
                    if shared.is_cancelled() {
                        return;
                    }
                }
                shared.complete();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn test_session() -> (Arc<SessionShared>, StreamHandle) {
        let shared = Arc::new(SessionShared::new(
            "sess-test".to_string(),
            Duration::from_millis(20),
        ));
        let handle = StreamHandle::new(Arc::clone(&shared));
        (shared, handle)
    }

    /// Collects dispatched events into a shared log for assertions.
    fn recording_listener(
        log: &Arc<StdMutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl FnMut(&AgentEvent) + Send + 'static {
        let log = Arc::clone(log);
        move |event| {
            let rendered = match event {
                AgentEvent::Json(value) => format!("{}:json:{}", tag, value),
                AgentEvent::Raw(text) => format!("{}:raw:{}", tag, text),
            };
            log.lock().unwrap().push(rendered);
        }
    }

    #[tokio::test]
    async fn test_data_frame_dispatches_parsed_json() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Message, recording_listener(&log, "m"));

        shared.process_frame(StreamFrame::Data(r#"{"type":"content","data":"{}"}"#.to_string()));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("m:json:"));
        assert!(log[0].contains("content"));
    }

    #[tokio::test]
    async fn test_unparseable_payload_degrades_to_raw() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Message, recording_listener(&log, "m"));
        handle.add_event_listener(EventKind::Error, recording_listener(&log, "e"));

        shared.process_frame(StreamFrame::Data("not-json".to_string()));

        let log = log.lock().unwrap();
        assert_eq!(log.as_slice(), ["m:raw:not-json"]);
    }

    #[tokio::test]
    async fn test_listeners_run_in_registration_order() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Message, recording_listener(&log, "first"));
        handle.add_event_listener(EventKind::Message, recording_listener(&log, "second"));

        shared.process_frame(StreamFrame::Data("{}".to_string()));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].starts_with("first:"));
        assert!(log[1].starts_with("second:"));
    }

    #[tokio::test]
    async fn test_remove_listener() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let id = handle.add_event_listener(EventKind::Message, recording_listener(&log, "m"));
        handle.remove_event_listener(EventKind::Message, id);
        // Removing again is a no-op
        handle.remove_event_listener(EventKind::Message, id);

        shared.process_frame(StreamFrame::Data("{}".to_string()));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_end_schedules_grace_close() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Message, recording_listener(&log, "m"));
        handle.add_event_listener(EventKind::Close, recording_listener(&log, "c"));

        shared.process_frame(StreamFrame::Data(
            r#"{"type":"message_end","data":"{}"}"#.to_string(),
        ));

        // Message dispatch is immediate; Close only after the grace period
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(handle.state(), SessionState::Idle);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[1].starts_with("c:json:"));
        assert_eq!(handle.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_event_close_frame_schedules_grace_close() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Close, recording_listener(&log, "c"));

        shared.process_frame(StreamFrame::EventClose);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(handle.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_explicit_close_cancels_pending_grace_close() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Close, recording_listener(&log, "c"));

        shared.process_frame(StreamFrame::EventClose);
        handle.close();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // The deferred dispatch lost the latch race: no Close event
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(handle.state(), SessionState::Cancelled);
    }

    #[tokio::test]
    async fn test_no_dispatch_after_close() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Message, recording_listener(&log, "m"));

        handle.close();
        shared.process_frame(StreamFrame::Data("{}".to_string()));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_after_close_is_swallowed() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Error, recording_listener(&log, "e"));

        handle.close();
        shared.fail("connection reset".to_string());

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(handle.state(), SessionState::Cancelled);
    }

    #[tokio::test]
    async fn test_transport_failure_dispatches_error_once() {
        let (shared, handle) = test_session();
        let log = Arc::new(StdMutex::new(Vec::new()));
        handle.add_event_listener(EventKind::Error, recording_listener(&log, "e"));

        shared.fail("boom".to_string());
        shared.fail("boom again".to_string());

        let log = log.lock().unwrap();
        assert_eq!(log.as_slice(), ["e:raw:boom"]);
        assert_eq!(handle.state(), SessionState::Errored);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_after_completion() {
        let (shared, handle) = test_session();
        shared.complete();
        assert_eq!(handle.state(), SessionState::Completed);

        handle.close();
        handle.close();
        // Natural completion is not downgraded to Cancelled
        assert_eq!(handle.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_terminal_states() {
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Errored.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Connecting.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
    }
}
