//! Conversation-id backend transport.
//!
//! The UMS agent keeps its own conversation history server-side and exposes
//! two operations: create-conversation (mints an id) and
//! continue-conversation (streams a textual reply as server-sent events).
//! The stream interleaves OpenAI-shaped content chunks with metadata lines;
//! metadata and other non-JSON payloads are skipped rather than treated as
//! errors.

use async_trait::async_trait;
use futures::future::ready;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use url::Url;

use crate::chat::SseLineDecoder;
use crate::error::LlmError;
use crate::message::Message;

/// Total request timeout for conversation calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Conversation-style backend contract.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Mint a new server-side conversation, returning its id.
    async fn create_conversation(&self) -> Result<String, LlmError>;

    /// Continue a conversation with one user message; yields streamed text
    /// deltas until the backend terminates the stream.
    async fn continue_conversation(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<TextStream, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a Message,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedConversation {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text delta from one SSE payload, or `None` for metadata and
/// other non-content payloads (the backend interleaves e.g. a
/// `{"conversation_id": ...}` line into the stream).
fn parse_chat_payload(payload: &str) -> Option<String> {
    let chunk: ChatChunk = serde_json::from_str(payload).ok()?;
    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

/// HTTP implementation of [`ConversationBackend`].
#[derive(Clone)]
pub struct HttpConversationBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpConversationBackend {
    pub fn new(endpoint: Url) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, endpoint })
    }

    fn url(&self, path: &str) -> Result<Url, LlmError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

#[async_trait]
impl ConversationBackend for HttpConversationBackend {
    async fn create_conversation(&self) -> Result<String, LlmError> {
        let resp = self.client.post(self.url("conversations")?).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("HTTP {status}: {body}")));
        }
        let raw = resp.text().await?;
        let created: CreatedConversation =
            serde_json::from_str(&raw).map_err(|e| LlmError::ResponseFormat {
                message: format!("failed to parse create-conversation response: {e}"),
                raw_response: raw,
            })?;
        Ok(created.id)
    }

    async fn continue_conversation(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<TextStream, LlmError> {
        let url = self.url(&format!("conversations/{conversation_id}/chat"))?;
        log::debug!("POST {url}");
        let body = ChatRequest {
            message,
            stream: true,
        };
        let resp = self.client.post(url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("HTTP {status}: {body}")));
        }

        let mut decoder = SseLineDecoder::default();
        // `Ok(None)` marks the [DONE] terminator so take_while can end the
        // stream without surfacing it to the caller.
        let stream = resp
            .bytes_stream()
            .map(move |chunk| -> Result<Vec<Option<String>>, LlmError> {
                let bytes = chunk?;
                let mut out = Vec::new();
                for payload in decoder.feed(&bytes) {
                    if payload == "[DONE]" {
                        out.push(None);
                        break;
                    }
                    if let Some(text) = parse_chat_payload(&payload) {
                        out.push(Some(text));
                    }
                }
                Ok(out)
            })
            .flat_map(|batch| {
                let items: Vec<Result<Option<String>, LlmError>> = match batch {
                    Ok(texts) => texts.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .take_while(|item| ready(!matches!(item, Ok(None))))
            .filter_map(|item| {
                ready(match item {
                    Ok(Some(text)) => Some(Ok(text)),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                })
            });
        Ok(Box::pin(stream))
    }
}
