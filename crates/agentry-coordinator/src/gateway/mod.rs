//! Per-backend adapters normalizing two heterogeneous agents behind one
//! contract.
//!
//! Both gateways stream: text is forwarded into the delegation stage as it
//! arrives and any nested progress deltas are mirrored through a
//! [`StageTracker`](crate::stage::StageTracker). A successful delegation
//! ends with the accumulated reply plus the conversation state to persist
//! for the next turn.

mod gpa;
mod ums;

pub use gpa::GpaGateway;
pub use ums::UmsGateway;

use agentry::{AgentName, Attachment, ConversationState, LlmError, Message};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::events::ResponseSink;
use crate::stage::Stage;

/// Output of a successful delegation.
#[derive(Debug)]
pub struct GatewayResponse {
    /// The delegate's accumulated reply text.
    pub content: String,
    /// Continuation token to embed in the outgoing assistant message, when
    /// the backend proposed one.
    pub state: Option<ConversationState>,
    /// Attachments produced by the delegate, already forwarded to the sink.
    pub attachments: Vec<Attachment>,
}

/// Failure of a delegation. Unlike routing and synthesis faults, these are
/// surfaced to the user.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The backend was unreachable or answered with an error.
    #[error("{agent} backend call failed: {source}")]
    Backend {
        agent: AgentName,
        #[source]
        source: LlmError,
    },

    /// The surrounding request was cancelled mid-delegation.
    #[error("delegation cancelled")]
    Cancelled,
}

/// One backend agent behind the coordinator.
///
/// Adding an agent means adding an [`AgentName`] variant and one gateway
/// implementation; nothing else in the flow branches on the concrete agent.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// The agent this gateway fronts.
    fn agent(&self) -> AgentName;

    /// Delegate one turn to the backend.
    ///
    /// Streams progress through `scope` (and, for nested delegate stages,
    /// through new stages on `sink`) while the call is in flight, then
    /// resolves with the final reply. Cancellation of the surrounding
    /// request aborts the backend stream; no stage is mutated afterwards.
    async fn respond(
        &self,
        sink: &Arc<ResponseSink>,
        scope: &Stage,
        history: &[Message],
        instructions: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError>;
}
