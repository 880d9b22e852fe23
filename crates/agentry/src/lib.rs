//! Core contracts for the agentry coordination layer.
//!
//! This crate defines the wire-level message model shared by the coordinator
//! and its backend agents, the tagged conversation-state codec, and the two
//! backend transport contracts: an OpenAI-compatible chat-completion provider
//! (used for routing, synthesis and the general-purpose agent) and a
//! conversation-id backend (used for the users-management agent).
//!
//! Orchestration itself lives in the `agentry-coordinator` crate.

pub mod chat;
pub mod conversation;
pub mod error;
pub mod message;
pub mod state;

pub use chat::{ChatProvider, ChatStream, HttpChatProvider, StreamEvent, StructuredOutputFormat};
pub use conversation::{ConversationBackend, HttpConversationBackend, TextStream};
pub use error::LlmError;
pub use message::{Attachment, CustomContent, Message, Role, StageDelta, StageStatus};
pub use state::{AgentName, ConversationState, StateError};
