//! Top-level state machine for one request.
//!
//! `Coordinating -> Delegating -> Synthesizing -> Done`, with two terminal
//! escapes: a delegation failure surfaces an error message to the user and
//! skips synthesis; a synthesis failure degrades to the delegate's raw
//! reply. The flow is strictly sequential: every step depends on the
//! previous one's output, and nothing re-enters an earlier state.

use agentry::{
    AgentName, ChatProvider, ConversationState, CustomContent, HttpChatProvider,
    HttpConversationBackend, LlmError, Message, Role, StreamEvent,
};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::events::ResponseSink;
use crate::gateway::{AgentGateway, GatewayError, GpaGateway, UmsGateway};
use crate::history::prepare_llm_messages;
use crate::prompts;
use crate::router::Router;

/// Orchestrates one request end-to-end; one instance per request flow.
pub struct Coordinator {
    llm: Arc<dyn ChatProvider>,
    router: Router,
    gpa: Arc<dyn AgentGateway>,
    ums: Arc<dyn AgentGateway>,
}

impl Coordinator {
    pub fn new(
        llm: Arc<dyn ChatProvider>,
        gpa: Arc<dyn AgentGateway>,
        ums: Arc<dyn AgentGateway>,
    ) -> Self {
        Self {
            router: Router::new(Arc::clone(&llm)),
            llm,
            gpa,
            ums,
        }
    }

    /// Wire up the HTTP backends from resolved connection parameters.
    pub fn from_config(config: &CoordinatorConfig) -> Result<Self, LlmError> {
        let llm: Arc<dyn ChatProvider> = Arc::new(HttpChatProvider::for_deployment(
            &config.llm.endpoint,
            &config.llm.deployment,
            config.llm.api_key.clone(),
        )?);
        let gpa_backend = Arc::new(HttpChatProvider::for_deployment(
            config.gpa.endpoint.as_ref().unwrap_or(&config.llm.endpoint),
            &config.gpa.deployment,
            config.llm.api_key.clone(),
        )?);
        let ums_backend = Arc::new(HttpConversationBackend::new(config.ums.endpoint.clone())?);
        Ok(Self::new(
            llm,
            Arc::new(GpaGateway::new(gpa_backend)),
            Arc::new(UmsGateway::new(ums_backend)),
        ))
    }

    fn gateway_for(&self, agent: AgentName) -> &Arc<dyn AgentGateway> {
        match agent {
            AgentName::Gpa => &self.gpa,
            AgentName::Ums => &self.ums,
        }
    }

    /// Handle one request, streaming deltas through `sink` as they arrive
    /// and resolving with the final assistant message.
    pub async fn handle_request(
        &self,
        history: &[Message],
        sink: &Arc<ResponseSink>,
    ) -> Result<Message, CoordinatorError> {
        let request_id = Uuid::new_v4();
        log::info!(
            "[{request_id}] handling request with {} message(s)",
            history.len()
        );

        // Coordinating
        let coordination = sink.open_stage("Coordination");
        let decision = self.router.decide(history).await;
        coordination.append_content(&format!(
            "Routing to: **{}**\nInstructions: {}",
            decision.agent_name,
            decision.additional_instructions.as_deref().unwrap_or("None")
        ));
        coordination.close();
        log::info!(
            "[{request_id}] routing to {} (instructions: {:?})",
            decision.agent_name,
            decision.additional_instructions
        );

        // Delegating
        let gateway = self.gateway_for(decision.agent_name);
        let scope = sink.open_stage(&format!("{} Agent", decision.agent_name));
        let delegated = gateway
            .respond(
                sink,
                &scope,
                history,
                decision.additional_instructions.as_deref(),
            )
            .await;
        scope.close();

        let reply = match delegated {
            Ok(reply) => reply,
            Err(GatewayError::Cancelled) => return Err(CoordinatorError::Cancelled),
            Err(error) => {
                log::error!(
                    "[{request_id}] delegation to {} failed: {error}",
                    decision.agent_name
                );
                let message = delegation_failure_message(decision.agent_name, &error);
                sink.content(message.text());
                return Ok(message);
            }
        };

        // Synthesizing
        let content = match self.synthesize(history, &reply.content, sink).await {
            Ok(text) => text,
            Err(CoordinatorError::Cancelled) => return Err(CoordinatorError::Cancelled),
            Err(error) => {
                log::warn!(
                    "[{request_id}] synthesis failed: {error}; returning the delegate reply unchanged"
                );
                sink.content(&reply.content);
                reply.content.clone()
            }
        };

        // Done
        let custom = CustomContent {
            attachments: if reply.attachments.is_empty() {
                None
            } else {
                Some(reply.attachments)
            },
            state: reply.state.as_ref().map(ConversationState::encode),
            stages: None,
        };
        Ok(Message {
            role: Role::Assistant,
            content: Some(content),
            custom_content: if custom.is_empty() { None } else { Some(custom) },
        })
    }

    /// Final LLM pass: the last user message augmented with the delegate's
    /// reply, streamed straight to the client as response content.
    async fn synthesize(
        &self,
        history: &[Message],
        agent_content: &str,
        sink: &Arc<ResponseSink>,
    ) -> Result<String, CoordinatorError> {
        let mut messages = prepare_llm_messages(history, prompts::FINAL_RESPONSE_SYSTEM_PROMPT);
        if let Some(last) = messages.last_mut() {
            let augmented = format!(
                "## Original User Request\n{}\n\n## Agent Response\n{agent_content}",
                last.text()
            );
            last.content = Some(augmented);
        }

        let mut stream = self.llm.chat_stream(&messages).await?;
        let mut content = String::new();
        while let Some(event) = stream.next().await {
            if sink.is_cancelled() {
                return Err(CoordinatorError::Cancelled);
            }
            match event? {
                StreamEvent::Content(text) => {
                    sink.content(text.as_str());
                    content.push_str(&text);
                }
                StreamEvent::Custom(_) => {}
                StreamEvent::Done => break,
            }
        }
        Ok(content)
    }
}

/// The user-visible reply for a failed delegation. The only fault class
/// that surfaces as an explicit error message.
fn delegation_failure_message(agent: AgentName, error: &GatewayError) -> Message {
    Message::assistant(format!(
        "The {agent} agent could not complete the request: {error}. Please try again."
    ))
}
