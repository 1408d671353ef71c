//! Wire types for the agent API endpoints.

use serde::{Deserialize, Serialize};

/// Role of the author of an agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
    System,
}

/// The message envelope carried inside both run endpoints.
///
/// `agent_session_id` and `message_agent_session_id` carry the same
/// generated session id; the backend uses them for correlation only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub agent_id: i64,
    pub agent_session_id: String,
    pub message_agent_session_id: String,
    pub role: MessageRole,
    pub message_type: i32,
    pub message_content: String,
}

/// Request body for `/api/ai/agent/run` and `/api/ai/agent/run/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRunRequest {
    pub agent_id: i64,
    pub api_key: String,
    pub agent_message: AgentMessage,
}

impl AgentRunRequest {
    /// Build a request for a single user message in the given session.
    pub fn new(agent_id: i64, api_key: String, session_id: String, content: String) -> Self {
        Self {
            agent_id,
            api_key,
            agent_message: AgentMessage {
                agent_id,
                agent_session_id: session_id.clone(),
                message_agent_session_id: session_id,
                role: MessageRole::User,
                message_type: 0,
                message_content: content,
            },
        }
    }
}

/// One agent as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentInfo {
    pub agent_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response body of `/api/ai/agent/list`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListAgentsResponse {
    #[serde(default)]
    pub agents: Vec<AgentInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_carries_session_id_twice() {
        let request = AgentRunRequest::new(
            15,
            "key-abc".to_string(),
            "ailearn_1700000000000_a1b2c3".to_string(),
            "hello".to_string(),
        );
        assert_eq!(request.agent_id, 15);
        assert_eq!(request.agent_message.agent_id, 15);
        assert_eq!(
            request.agent_message.agent_session_id,
            request.agent_message.message_agent_session_id
        );
        assert_eq!(request.agent_message.message_type, 0);
        assert_eq!(request.agent_message.role, MessageRole::User);
    }

    #[test]
    fn test_run_request_serialization_shape() {
        let request = AgentRunRequest::new(
            16,
            "key".to_string(),
            "sess".to_string(),
            "content".to_string(),
        );
        let json = serde_json::to_value(&request).expect("Failed to serialize");
        assert_eq!(json["agent_id"], 16);
        assert_eq!(json["api_key"], "key");
        assert_eq!(json["agent_message"]["role"], "user");
        assert_eq!(json["agent_message"]["message_content"], "content");
    }

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::User).expect("Failed to serialize"),
            "\"user\""
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).expect("Failed to serialize"),
            "\"assistant\""
        );
    }

    #[test]
    fn test_list_agents_response_tolerates_missing_fields() {
        let response: ListAgentsResponse = serde_json::from_str("{}").expect("Failed to parse");
        assert!(response.agents.is_empty());

        let response: ListAgentsResponse =
            serde_json::from_str(r#"{"agents":[{"agent_id":17}]}"#).expect("Failed to parse");
        assert_eq!(response.agents.len(), 1);
        assert_eq!(response.agents[0].agent_id, 17);
        assert_eq!(response.agents[0].name, "");
        assert!(response.agents[0].description.is_none());
    }
}
