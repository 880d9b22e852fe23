//! Gateway for the general-purpose agent.
//!
//! The GPA backend is stateless: every request must carry the tool history
//! of the turns it should resume from. The gateway rebuilds that history
//! from the transcript, streams the backend's reply into the delegation
//! stage, mirrors nested progress stages, and wraps the backend's terminal
//! state blob for the next turn.

use agentry::{
    AgentName, ChatProvider, ConversationState, CustomContent, Message, Role, StreamEvent,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use crate::events::ResponseSink;
use crate::gateway::{AgentGateway, GatewayError, GatewayResponse};
use crate::stage::{Stage, StageTracker};

pub struct GpaGateway {
    backend: Arc<dyn ChatProvider>,
}

impl GpaGateway {
    pub fn new(backend: Arc<dyn ChatProvider>) -> Self {
        Self { backend }
    }

    /// Rebuild the backend-native request history from the transcript.
    ///
    /// Every assistant turn whose state decodes to the GPA marker is
    /// resumable: its immediately preceding user message and the assistant
    /// message itself (state rewritten back to the native tool-history
    /// format) are included. Turns belonging to the other agent are skipped
    /// entirely, so UMS state never leaks into a GPA request. The current
    /// user message goes last, with the coordinator's instructions appended
    /// when present.
    fn prepare_history(history: &[Message], instructions: Option<&str>) -> Vec<Message> {
        let mut outgoing = Vec::new();
        for (i, msg) in history.iter().enumerate() {
            if msg.role != Role::Assistant {
                continue;
            }
            let Some(raw) = msg.state() else { continue };
            match ConversationState::decode(raw) {
                Ok(ConversationState::Gpa { tool_history }) => {
                    if let Some(prev) = i.checked_sub(1).and_then(|p| history.get(p))
                        && prev.role == Role::User
                    {
                        outgoing.push(prev.clone());
                    }
                    outgoing.push(Message {
                        role: Role::Assistant,
                        content: msg.content.clone(),
                        custom_content: Some(CustomContent {
                            attachments: None,
                            state: Some(tool_history),
                            stages: None,
                        }),
                    });
                }
                Ok(ConversationState::Ums { .. }) => {}
                Err(e) => {
                    log::warn!("skipping assistant turn with undecodable state: {e}");
                }
            }
        }

        if let Some(last) = history.last()
            && last.role == Role::User
        {
            let mut current = last.clone();
            if let Some(instructions) = instructions {
                current.content = Some(format!(
                    "{}\n\nAdditional context: {instructions}",
                    current.text()
                ));
            }
            outgoing.push(current);
        }
        outgoing
    }

    fn backend_error(source: agentry::LlmError) -> GatewayError {
        GatewayError::Backend {
            agent: AgentName::Gpa,
            source,
        }
    }
}

#[async_trait]
impl AgentGateway for GpaGateway {
    fn agent(&self) -> AgentName {
        AgentName::Gpa
    }

    async fn respond(
        &self,
        sink: &Arc<ResponseSink>,
        scope: &Stage,
        history: &[Message],
        instructions: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let outgoing = Self::prepare_history(history, instructions);
        log::debug!("delegating to GPA with {} restored message(s)", outgoing.len());

        let mut stream = self
            .backend
            .chat_stream(&outgoing)
            .await
            .map_err(Self::backend_error)?;

        let mut tracker = StageTracker::new(Arc::clone(sink));
        let mut content = String::new();
        let mut attachments = Vec::new();
        let mut tool_history = None;

        while let Some(event) = stream.next().await {
            if sink.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
            match event.map_err(Self::backend_error)? {
                StreamEvent::Content(text) => {
                    scope.append_content(&text);
                    content.push_str(&text);
                }
                StreamEvent::Custom(custom) => {
                    if let Some(incoming) = custom.attachments {
                        for attachment in incoming {
                            sink.attachment(attachment.clone());
                            attachments.push(attachment);
                        }
                    }
                    if let Some(stages) = custom.stages {
                        for delta in &stages {
                            tracker.update(delta);
                        }
                    }
                    if let Some(state) = custom.state {
                        tool_history = Some(state);
                    }
                }
                StreamEvent::Done => break,
            }
        }
        tracker.close_all();

        Ok(GatewayResponse {
            content,
            state: tool_history.map(|raw| ConversationState::Gpa { tool_history: raw }),
            attachments,
        })
    }
}
