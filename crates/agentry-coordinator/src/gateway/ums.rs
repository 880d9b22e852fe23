//! Gateway for the users-management service agent.
//!
//! The UMS backend is stateful: it keeps the conversation history on its
//! side, addressed by a conversation id. The gateway resolves the id from
//! the newest UMS-marked assistant turn, minting a new conversation exactly
//! once when none exists, and streams the reply into the delegation stage.
//! The backend emits no nested stages.

use agentry::{AgentName, ConversationBackend, ConversationState, Message, Role};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use crate::events::ResponseSink;
use crate::gateway::{AgentGateway, GatewayError, GatewayResponse};
use crate::stage::Stage;

pub struct UmsGateway {
    backend: Arc<dyn ConversationBackend>,
}

impl UmsGateway {
    pub fn new(backend: Arc<dyn ConversationBackend>) -> Self {
        Self { backend }
    }

    /// Newest-first scan for a UMS continuation in the transcript.
    fn resolve_conversation_id(history: &[Message]) -> Option<String> {
        for msg in history.iter().rev() {
            if msg.role != Role::Assistant {
                continue;
            }
            let Some(raw) = msg.state() else { continue };
            match ConversationState::decode(raw) {
                Ok(ConversationState::Ums { conversation_id }) => return Some(conversation_id),
                Ok(ConversationState::Gpa { .. }) => {}
                Err(e) => {
                    log::warn!("skipping assistant turn with undecodable state: {e}");
                }
            }
        }
        None
    }

    fn backend_error(source: agentry::LlmError) -> GatewayError {
        GatewayError::Backend {
            agent: AgentName::Ums,
            source,
        }
    }
}

#[async_trait]
impl AgentGateway for UmsGateway {
    fn agent(&self) -> AgentName {
        AgentName::Ums
    }

    async fn respond(
        &self,
        sink: &Arc<ResponseSink>,
        scope: &Stage,
        history: &[Message],
        instructions: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let conversation_id = match Self::resolve_conversation_id(history) {
            Some(id) => {
                log::debug!("reusing UMS conversation {id}");
                id
            }
            None => {
                let id = self
                    .backend
                    .create_conversation()
                    .await
                    .map_err(Self::backend_error)?;
                log::debug!("created UMS conversation {id}");
                id
            }
        };

        let mut user_content = history.last().map(|m| m.text().to_string()).unwrap_or_default();
        if let Some(instructions) = instructions {
            user_content = format!("{user_content}\n\nAdditional context: {instructions}");
        }
        let message = Message::user(user_content);

        let mut stream = self
            .backend
            .continue_conversation(&conversation_id, &message)
            .await
            .map_err(Self::backend_error)?;

        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            if sink.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
            let text = chunk.map_err(Self::backend_error)?;
            scope.append_content(&text);
            content.push_str(&text);
        }

        Ok(GatewayResponse {
            content,
            state: Some(ConversationState::Ums { conversation_id }),
            attachments: Vec::new(),
        })
    }
}
