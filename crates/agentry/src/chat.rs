//! Chat-completion transport.
//!
//! One contract serves three callers: the routing decision (structured
//! output), the final synthesis pass (streamed text) and the GPA backend
//! (streamed text plus custom-content payloads). The HTTP implementation
//! speaks the deployment-addressed OpenAI-compatible protocol, with
//! server-sent events for streaming.

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use url::Url;

use crate::error::LlmError;
use crate::message::{CustomContent, Message};

/// API version pinned for deployment-addressed endpoints.
const API_VERSION: &str = "2025-01-01-preview";

/// JSON-schema response-format constraint accepted by OpenAI-compatible
/// endpoints. Field descriptions inside `schema` are part of the contract:
/// they bias decision quality but are never validated semantically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutputFormat {
    /// Name of the schema.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The JSON schema for the structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// One decoded unit of a streamed chat response, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text content delta.
    Content(String),
    /// Custom-content payload: attachments, nested stage deltas, or the
    /// terminal opaque state blob.
    Custom(CustomContent),
    /// Stream ended.
    Done,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Chat-completion backend contract.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Single-shot completion; returns the assistant text content.
    async fn chat(
        &self,
        messages: &[Message],
        response_format: Option<StructuredOutputFormat>,
    ) -> Result<String, LlmError>;

    /// Streaming completion.
    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError>;
}

/// `{"type": "json_schema", "json_schema": {...}}` as the wire expects it.
#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: StructuredOutputFormat,
}

impl From<StructuredOutputFormat> for ResponseFormat {
    fn from(format: StructuredOutputFormat) -> Self {
        ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: format,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunkBody {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    custom_content: Option<CustomContent>,
}

/// Splits an SSE byte stream into `data:` payloads, buffering partial lines
/// across network chunks.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: String,
}

impl SseLineDecoder {
    /// Feed one network chunk; returns every complete `data:` payload seen
    /// so far. Non-data lines and blank keep-alive lines are dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// Decode one SSE data payload into stream events.
///
/// `[DONE]` is the terminator; anything else must be a well-formed chunk
/// body, otherwise the whole stream is considered malformed.
pub fn decode_stream_payload(payload: &str) -> Result<Vec<StreamEvent>, LlmError> {
    if payload == "[DONE]" {
        return Ok(vec![StreamEvent::Done]);
    }

    let chunk: StreamChunkBody =
        serde_json::from_str(payload).map_err(|e| LlmError::ResponseFormat {
            message: format!("failed to parse stream chunk: {e}"),
            raw_response: payload.to_string(),
        })?;

    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content
            && !content.is_empty()
        {
            events.push(StreamEvent::Content(content));
        }
        if let Some(custom) = choice.delta.custom_content
            && !custom.is_empty()
        {
            events.push(StreamEvent::Custom(custom));
        }
        if choice.finish_reason.is_some() {
            events.push(StreamEvent::Done);
        }
    }
    Ok(events)
}

/// Deployment-addressed OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct HttpChatProvider {
    client: reqwest::Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpChatProvider {
    /// Build a client for one deployment behind `endpoint`.
    pub fn for_deployment(
        endpoint: &Url,
        deployment: &str,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let base = endpoint.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{base}/openai/deployments/{deployment}/chat/completions"
        ))?;
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        })
    }

    fn request(&self, body: &ChatCompletionRequest<'_>) -> reqwest::RequestBuilder {
        let mut req = self.client.post(self.url.clone()).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("Api-Key", key);
        }
        req
    }

    async fn send(&self, body: &ChatCompletionRequest<'_>) -> Result<reqwest::Response, LlmError> {
        log::debug!("POST {} (stream: {})", self.url, body.stream);
        let resp = self.request(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("HTTP {status}: {body}")));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn chat(
        &self,
        messages: &[Message],
        response_format: Option<StructuredOutputFormat>,
    ) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            messages,
            stream: false,
            response_format: response_format.map(Into::into),
        };
        let resp = self.send(&body).await?;
        let raw = resp.text().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::ResponseFormat {
                message: format!("failed to parse completion response: {e}"),
                raw_response: raw.clone(),
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::ResponseFormat {
                message: "completion response carried no content".to_string(),
                raw_response: raw,
            })
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        let body = ChatCompletionRequest {
            messages,
            stream: true,
            response_format: None,
        };
        let resp = self.send(&body).await?;

        let mut decoder = SseLineDecoder::default();
        let stream = resp
            .bytes_stream()
            .map(move |chunk| -> Result<Vec<StreamEvent>, LlmError> {
                let bytes = chunk?;
                let mut events = Vec::new();
                for payload in decoder.feed(&bytes) {
                    events.extend(decode_stream_payload(&payload)?);
                }
                Ok(events)
            })
            .flat_map(|batch| {
                let items: Vec<Result<StreamEvent, LlmError>> = match batch {
                    Ok(events) => events.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            });
        Ok(Box::pin(stream))
    }
}
