//! Data models for the agent API and the learning domain.
//!
//! # Module structure
//! - `agent` - wire types for the agent endpoints (request envelope,
//!   agent listing, synchronous run)
//! - `course` - learning domain objects recovered from model replies
//!   (exercises, outlines, judgments)

mod agent;
mod course;

pub use agent::{AgentInfo, AgentMessage, AgentRunRequest, ListAgentsResponse, MessageRole};
pub use course::{Chapter, Difficulty, Exercise, Judgment, Outline, Section};
