//! Tagged conversation-state codec.
//!
//! Each gateway proposes an opaque continuation token at the end of a turn.
//! The token is embedded verbatim in the assistant message's
//! `custom_content.state` and read back by the same gateway variant on a
//! later turn. The tag keeps the two backends' incompatible state models
//! from bleeding into each other: a GPA turn never resumes from UMS state
//! and vice versa.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

/// The two backend agents known to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    /// General-purpose agent: web search, document RAG, code execution,
    /// image generation.
    Gpa,
    /// Users-management service agent: user CRUD and listing.
    Ums,
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentName::Gpa => write!(f, "GPA"),
            AgentName::Ums => write!(f, "UMS"),
        }
    }
}

/// Continuation token for exactly one backend agent.
///
/// Serialized with an `agent` tag so a stored blob is always attributable
/// to the gateway that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent", rename_all = "snake_case")]
pub enum ConversationState {
    /// GPA turns resume from the backend's raw tool-call history, kept
    /// opaque here and handed back to the backend untouched.
    Gpa { tool_history: Value },
    /// UMS tracks its own history server-side; only the conversation id is
    /// kept.
    Ums { conversation_id: String },
}

/// Failure to decode a persisted conversation-state blob.
#[derive(Error, Debug)]
pub enum StateError {
    /// The blob carries no recognizable agent marker.
    #[error("unrecognized state shape: {0}")]
    UnrecognizedShape(String),
}

impl ConversationState {
    /// Decode a raw blob read back from `custom_content.state`.
    pub fn decode(raw: &Value) -> Result<Self, StateError> {
        serde_json::from_value(raw.clone())
            .map_err(|e| StateError::UnrecognizedShape(e.to_string()))
    }

    /// Encode for embedding into `custom_content.state`.
    pub fn encode(&self) -> Value {
        match self {
            ConversationState::Gpa { tool_history } => {
                json!({"agent": "gpa", "tool_history": tool_history})
            }
            ConversationState::Ums { conversation_id } => {
                json!({"agent": "ums", "conversation_id": conversation_id})
            }
        }
    }

    /// The agent this state belongs to.
    pub fn agent(&self) -> AgentName {
        match self {
            ConversationState::Gpa { .. } => AgentName::Gpa,
            ConversationState::Ums { .. } => AgentName::Ums,
        }
    }
}
