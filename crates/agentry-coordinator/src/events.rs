//! Per-request response channel.
//!
//! A [`ResponseSink`] is the single route from the coordinator and its
//! gateways to the client: content deltas, stage deltas and attachments all
//! flow through it in emission order. Each sink is owned by exactly one
//! in-flight response and discarded with it, so the stage index space needs
//! no locking beyond the allocation counter.

use agentry::{Attachment, StageDelta};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::stage::Stage;

/// One unit of streamed response output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// Append to the response's text content.
    Content { delta: String },
    /// Stage lifecycle or content update, already translated into the
    /// response's own index space.
    Stage { delta: StageDelta },
    /// Attachment on the response itself.
    Attachment { attachment: Attachment },
}

/// Event channel for one in-flight response.
pub struct ResponseSink {
    sender: mpsc::UnboundedSender<ResponseEvent>,
    cancellation: CancellationToken,
    next_stage_index: AtomicU32,
}

impl ResponseSink {
    /// Create a sink and the receiving end the host drains.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<ResponseEvent>) {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Like [`ResponseSink::channel`], bound to an externally owned
    /// cancellation token (e.g. the request context of the host server).
    pub fn with_cancellation(
        cancellation: CancellationToken,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ResponseEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            sender,
            cancellation,
            next_stage_index: AtomicU32::new(0),
        });
        (sink, receiver)
    }

    /// Emit one event. After cancellation events are discarded, not queued;
    /// a dropped receiver (client gone) is likewise not an error.
    pub fn emit(&self, event: ResponseEvent) {
        if self.cancellation.is_cancelled() {
            log::debug!("discarding response event after cancellation");
            return;
        }
        let _ = self.sender.send(event);
    }

    /// Append text to the response content.
    pub fn content(&self, delta: impl Into<String>) {
        let delta = delta.into();
        if delta.is_empty() {
            return;
        }
        self.emit(ResponseEvent::Content { delta });
    }

    /// Attach a payload to the response.
    pub fn attachment(&self, attachment: Attachment) {
        self.emit(ResponseEvent::Attachment { attachment });
    }

    /// Open a new stage owned by this response.
    pub fn open_stage(self: &Arc<Self>, name: &str) -> Stage {
        Stage::open(Arc::clone(self), name)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Allocate the next outbound stage index. Indices are unique within
    /// the response and never reused.
    pub(crate) fn next_stage_index(&self) -> u32 {
        self.next_stage_index.fetch_add(1, Ordering::Relaxed)
    }
}
