//! LLM-driven routing.

use agentry::{AgentName, ChatProvider, Message};
use std::sync::Arc;

use crate::decision::CoordinationDecision;
use crate::history::prepare_llm_messages;
use crate::prompts;

/// Issues the per-request routing decision through one structured-output
/// chat call.
pub struct Router {
    llm: Arc<dyn ChatProvider>,
}

impl Router {
    pub fn new(llm: Arc<dyn ChatProvider>) -> Self {
        Self { llm }
    }

    /// Decide which agent handles the request.
    ///
    /// Never fails: an unreachable endpoint, a malformed reply or an agent
    /// name outside the known set all resolve to the fallback decision
    /// (general-purpose agent, no instructions). The fallback is policy,
    /// not an error path; it is logged and the request continues.
    pub async fn decide(&self, history: &[Message]) -> CoordinationDecision {
        let messages = prepare_llm_messages(history, prompts::COORDINATION_SYSTEM_PROMPT);
        let reply = match self
            .llm
            .chat(&messages, Some(CoordinationDecision::response_format()))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("routing call failed: {e}; falling back to {}", AgentName::Gpa);
                return CoordinationDecision::fallback();
            }
        };

        match serde_json::from_str::<CoordinationDecision>(&reply) {
            Ok(decision) => decision,
            Err(e) => {
                log::warn!(
                    "routing reply rejected ({e}); falling back to {}. Reply was: {reply}",
                    AgentName::Gpa
                );
                CoordinationDecision::fallback()
            }
        }
    }
}
