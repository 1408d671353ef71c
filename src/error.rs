//! Error types for the agent client.
//!
//! Taxonomy:
//! - transport failures (HTTP status / network) surface as [`AgentError`]
//!   values or as `Error` dispatches on an open stream - never retried here
//! - malformed JSON inside a stream frame is *not* an error: the session
//!   degrades to delivering the raw string
//! - a completed reply with no recoverable JSON object is an explicit
//!   [`AgentError::NoStructuredOutput`], carrying the raw text so callers
//!   can still display it
//! - cancellation is not an error and never produces one

/// Error type for agent client operations.
#[derive(Debug)]
pub enum AgentError {
    /// HTTP request failed
    Http(reqwest::Error),
    /// JSON serialization/deserialization failed
    Json(serde_json::Error),
    /// Server returned an error status
    ServerError { status: u16, message: String },
    /// The stream transport failed mid-exchange
    Stream { message: String },
    /// The backend reported an error event inside the stream
    Backend { message: String },
    /// A completed reply contained no recoverable JSON object
    NoStructuredOutput { raw: String },
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Http(e) => write!(f, "HTTP error: {}", e),
            AgentError::Json(e) => write!(f, "JSON error: {}", e),
            AgentError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            AgentError::Stream { message } => write!(f, "Stream error: {}", message),
            AgentError::Backend { message } => write!(f, "Backend error: {}", message),
            AgentError::NoStructuredOutput { .. } => {
                write!(f, "No JSON object found in the reply")
            }
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Http(e) => Some(e),
            AgentError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::Http(e)
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Json(e)
    }
}
