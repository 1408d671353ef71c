//! Agent API client for backend communication.
//!
//! Provides the HTTP client for the AILearn agent backend: the two plain
//! request/response endpoints (list, synchronous run) and the streaming
//! run endpoint consumed as an SSE-style event stream.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::agent::session::{drive_stream, SessionShared, StreamHandle, DEFAULT_CLOSE_GRACE};
use crate::error::AgentError;
use crate::models::{AgentInfo, AgentRunRequest, ListAgentsResponse};

/// Default base URL for the agent backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Client for the AILearn agent backend API.
///
/// Cheap to construct; the inner HTTP client pools connections. Every
/// streaming call opens a fresh transport - the client makes no idempotency
/// assumptions about repeated identical requests.
pub struct AgentClient {
    /// Base URL for the agent API
    pub base_url: String,
    /// Reusable HTTP client
    client: Client,
    /// Delay between the end-of-turn marker and transport shutdown
    close_grace: Duration,
}

impl AgentClient {
    /// Create a new AgentClient with the default base URL.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create a new AgentClient with a custom base URL.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    /// Override the grace period applied before the deferred close
    /// (builder pattern).
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Fetch the agents available on the backend.
    ///
    /// `POST /api/ai/agent/list` with an empty JSON body.
    pub async fn list_agents(&self) -> Result<Vec<AgentInfo>, AgentError> {
        let url = format!("{}/api/ai/agent/list", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::ServerError { status, message });
        }

        let body: ListAgentsResponse = response.json().await?;
        Ok(body.agents)
    }

    /// Run an agent synchronously and return the raw response body.
    ///
    /// `POST /api/ai/agent/run`. The response shape is backend-defined and
    /// treated as a black box here.
    pub async fn run_agent(&self, request: &AgentRunRequest) -> Result<Value, AgentError> {
        let url = format!("{}/api/ai/agent/run", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::ServerError { status, message });
        }

        Ok(response.json().await?)
    }

    /// Open a streaming run and return its handle immediately.
    ///
    /// `POST /api/ai/agent/run/stream`. The request body is opaque to the
    /// session layer. Connection and transport failures surface as a single
    /// `Error` dispatch on the handle, never as a return value; retry policy
    /// is the caller's responsibility. Must be called from within a tokio
    /// runtime.
    pub fn run_agent_stream(&self, request: AgentRunRequest) -> StreamHandle {
        let session_id = request.agent_message.agent_session_id.clone();
        let shared = Arc::new(SessionShared::new(session_id, self.close_grace));
        let handle = StreamHandle::new(Arc::clone(&shared));

        let builder = self
            .client
            .post(format!("{}/api/ai/agent/run/stream", self.base_url))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request);

        tokio::spawn(drive_stream(shared, builder));

        handle
    }
}

impl Default for AgentClient {
    fn default() -> Self {
        Self::new()
    }
}
