//! AILearn client - streaming agent-session protocol client with tolerant
//! structured-output recovery.
//!
//! The crate opens long-lived streaming requests against the AILearn agent
//! backend, parses the SSE-shaped response into typed events, and rebuilds
//! structured domain objects (exercises, outlines, judgments) from the
//! model's free-form reply text.
//!
//! Layers, leaves first:
//! - [`sse`] - chunk-tolerant frame parsing
//! - [`agent`] - session lifecycle, subscriber dispatch, reply collection
//! - [`recovery`] - tolerant JSON extraction from completed replies
//! - [`markdown`] - collapsed-table repair for model-emitted markdown
//! - [`tutor`] - the learning flows tying the layers together

pub mod agent;
pub mod config;
pub mod error;
pub mod markdown;
pub mod models;
pub mod recovery;
pub mod sse;
pub mod tutor;
