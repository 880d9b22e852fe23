//! In-crate fakes for exercising orchestration paths without a network.

use agentry::{
    ChatProvider, ChatStream, ConversationBackend, LlmError, Message, StreamEvent,
    StructuredOutputFormat, TextStream,
};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::events::ResponseEvent;

/// Drain everything currently buffered in a response receiver.
pub(crate) fn drain(receiver: &mut UnboundedReceiver<ResponseEvent>) -> Vec<ResponseEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Keep only the stage deltas of an event sequence, in order.
pub(crate) fn stage_deltas(events: Vec<ResponseEvent>) -> Vec<agentry::StageDelta> {
    events
        .into_iter()
        .filter_map(|event| match event {
            ResponseEvent::Stage { delta } => Some(delta),
            _ => None,
        })
        .collect()
}

type StreamScript = Result<Vec<Result<StreamEvent, LlmError>>, LlmError>;

/// Scripted [`ChatProvider`]: replies and streams are served in push order.
#[derive(Default)]
pub(crate) struct FakeChatProvider {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    chat_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
    last_stream_messages: Mutex<Vec<Message>>,
    last_response_format: Mutex<Option<StructuredOutputFormat>>,
}

impl FakeChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Result<String, LlmError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn push_stream(&self, events: Vec<Result<StreamEvent, LlmError>>) {
        self.streams.lock().unwrap().push_back(Ok(events));
    }

    pub fn push_stream_error(&self, error: LlmError) {
        self.streams.lock().unwrap().push_back(Err(error));
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages.lock().unwrap().clone()
    }

    pub fn last_stream_messages(&self) -> Vec<Message> {
        self.last_stream_messages.lock().unwrap().clone()
    }

    pub fn last_response_format(&self) -> Option<StructuredOutputFormat> {
        self.last_response_format.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for FakeChatProvider {
    async fn chat(
        &self,
        messages: &[Message],
        response_format: Option<StructuredOutputFormat>,
    ) -> Result<String, LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        *self.last_response_format.lock().unwrap() = response_format;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Provider("no scripted reply".to_string())))
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_stream_messages.lock().unwrap() = messages.to_vec();
        match self.streams.lock().unwrap().pop_front() {
            Some(Ok(events)) => Ok(Box::pin(stream::iter(events))),
            Some(Err(error)) => Err(error),
            None => Err(LlmError::Provider("no scripted stream".to_string())),
        }
    }
}

/// Scripted [`ConversationBackend`] recording every call.
#[derive(Default)]
pub(crate) struct FakeConversationBackend {
    created: Mutex<VecDeque<Result<String, LlmError>>>,
    replies: Mutex<VecDeque<Result<Vec<Result<String, LlmError>>, LlmError>>>,
    create_calls: AtomicUsize,
    chats: Mutex<Vec<(String, Message)>>,
}

impl FakeConversationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_created_id(&self, id: &str) {
        self.created.lock().unwrap().push_back(Ok(id.to_string()));
    }

    pub fn fail_create(&self, error: LlmError) {
        self.created.lock().unwrap().push_back(Err(error));
    }

    pub fn push_reply(&self, reply: Result<Vec<Result<String, LlmError>>, LlmError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> Vec<(String, Message)> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationBackend for FakeConversationBackend {
    async fn create_conversation(&self) -> Result<String, LlmError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.created
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Provider("no scripted conversation id".to_string())))
    }

    async fn continue_conversation(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<TextStream, LlmError> {
        self.chats
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message.clone()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(chunks)) => Ok(Box::pin(stream::iter(chunks))),
            Some(Err(error)) => Err(error),
            None => Err(LlmError::Provider("no scripted conversation reply".to_string())),
        }
    }
}
