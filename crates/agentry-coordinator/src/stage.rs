//! Progress stages and the delegate-stage mirror.
//!
//! A [`Stage`] is a runtime handle for one progress indicator inside one
//! response; it owns an outbound index allocated by the response's sink and
//! is never persisted. The [`StageTracker`] republishes a delegate's nested
//! stage deltas as stages of the current response, keyed by the delegate's
//! own indices.

use agentry::{Attachment, StageDelta, StageStatus};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::{ResponseEvent, ResponseSink};

/// Handle for one progress indicator within a response.
pub struct Stage {
    sink: Arc<ResponseSink>,
    index: u32,
    closed: AtomicBool,
}

impl Stage {
    /// Allocate an index and announce the stage as open.
    pub(crate) fn open(sink: Arc<ResponseSink>, name: &str) -> Self {
        let index = sink.next_stage_index();
        sink.emit(ResponseEvent::Stage {
            delta: StageDelta::open(index, name),
        });
        Self {
            sink,
            index,
            closed: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Append text to the stage content. A no-op once the stage is closed.
    pub fn append_content(&self, content: &str) {
        if content.is_empty() || self.is_closed() {
            return;
        }
        self.sink.emit(ResponseEvent::Stage {
            delta: StageDelta::content(self.index, content),
        });
    }

    /// Attach a payload to the stage. A no-op once the stage is closed.
    pub fn add_attachment(&self, attachment: Attachment) {
        if self.is_closed() {
            return;
        }
        self.sink.emit(ResponseEvent::Stage {
            delta: StageDelta {
                index: self.index,
                name: None,
                status: None,
                content: None,
                attachments: Some(vec![attachment]),
            },
        });
    }

    /// Close the stage. Idempotent: the terminal delta is emitted once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sink.emit(ResponseEvent::Stage {
            delta: StageDelta::completed(self.index),
        });
    }
}

/// Registry mirroring a delegate's nested progress stages.
///
/// The map is exclusively owned by the single in-flight delegation; arrival
/// order of delegate indices carries no meaning, so every lookup goes
/// through the map rather than any queue.
pub struct StageTracker {
    sink: Arc<ResponseSink>,
    stages: HashMap<u32, Stage>,
}

impl StageTracker {
    pub fn new(sink: Arc<ResponseSink>) -> Self {
        Self {
            sink,
            stages: HashMap::new(),
        }
    }

    /// Apply one delta keyed by the delegate's stage index.
    ///
    /// An unseen index opens a new stage (named from the delta or a
    /// generated default); a seen index appends. Completions are
    /// idempotent, and a completion for an index that was never opened is
    /// treated as already closed and ignored.
    pub fn update(&mut self, delta: &StageDelta) {
        let stage = match self.stages.entry(delta.index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if delta.status == Some(StageStatus::Completed) {
                    log::debug!(
                        "ignoring completion for unknown delegate stage {}",
                        delta.index
                    );
                    return;
                }
                let name = delta
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Stage {}", delta.index));
                entry.insert(Stage::open(Arc::clone(&self.sink), &name))
            }
        };

        if let Some(content) = &delta.content {
            stage.append_content(content);
        }
        if let Some(attachments) = &delta.attachments {
            for attachment in attachments {
                stage.add_attachment(attachment.clone());
            }
        }
        if delta.status == Some(StageStatus::Completed) {
            stage.close();
        }
    }

    /// Force-close every stage still open. Called at the end of the owning
    /// delegation so an upstream stream that ends without terminal statuses
    /// leaves no dangling indicator.
    pub fn close_all(&mut self) {
        for stage in self.stages.values() {
            stage.close();
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{drain, stage_deltas};

    fn tracker() -> (StageTracker, tokio::sync::mpsc::UnboundedReceiver<ResponseEvent>) {
        let (sink, receiver) = ResponseSink::channel();
        (StageTracker::new(sink), receiver)
    }

    // ── Stage handle ───────────────────────────────────────────────────────

    #[test]
    fn open_emits_named_open_delta() {
        let (sink, mut receiver) = ResponseSink::channel();
        let stage = sink.open_stage("Coordination");
        stage.append_content("routing");
        stage.close();

        let deltas = stage_deltas(drain(&mut receiver));
        assert_eq!(deltas[0], StageDelta::open(stage.index(), "Coordination"));
        assert_eq!(deltas[1], StageDelta::content(stage.index(), "routing"));
        assert_eq!(deltas[2], StageDelta::completed(stage.index()));
    }

    #[test]
    fn close_is_idempotent() {
        let (sink, mut receiver) = ResponseSink::channel();
        let stage = sink.open_stage("once");
        stage.close();
        stage.close();
        stage.close();

        let deltas = stage_deltas(drain(&mut receiver));
        let completions = deltas
            .iter()
            .filter(|d| d.status == Some(StageStatus::Completed))
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn content_after_close_is_dropped() {
        let (sink, mut receiver) = ResponseSink::channel();
        let stage = sink.open_stage("done");
        stage.close();
        stage.append_content("too late");
        stage.add_attachment(Attachment::default());

        let deltas = stage_deltas(drain(&mut receiver));
        assert_eq!(deltas.len(), 2); // open + completed, nothing after
    }

    // ── Tracker semantics ──────────────────────────────────────────────────

    #[test]
    fn unseen_index_opens_with_delta_name() {
        let (mut tracker, mut receiver) = tracker();
        tracker.update(&StageDelta {
            index: 7,
            name: Some("Searching".to_string()),
            status: Some(StageStatus::Open),
            content: Some("query sent".to_string()),
            attachments: None,
        });

        let deltas = stage_deltas(drain(&mut receiver));
        assert_eq!(deltas[0].name.as_deref(), Some("Searching"));
        assert_eq!(deltas[0].status, Some(StageStatus::Open));
        assert_eq!(deltas[1].content.as_deref(), Some("query sent"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn unseen_index_without_name_gets_generated_default() {
        let (mut tracker, mut receiver) = tracker();
        tracker.update(&StageDelta::content(3, "working"));

        let deltas = stage_deltas(drain(&mut receiver));
        assert_eq!(deltas[0].name.as_deref(), Some("Stage 3"));
    }

    #[test]
    fn interleaved_indices_are_independent() {
        let (mut tracker, mut receiver) = tracker();
        // 0 opens, 1 opens, 0 updates, 1 updates, 0 closes, 1 closes
        tracker.update(&StageDelta::open(0, "first"));
        tracker.update(&StageDelta::open(1, "second"));
        tracker.update(&StageDelta::content(0, "a"));
        tracker.update(&StageDelta::content(1, "b"));
        tracker.update(&StageDelta::completed(0));
        tracker.update(&StageDelta::completed(1));

        let deltas = stage_deltas(drain(&mut receiver));
        let first_index = deltas[0].index;
        let second_index = deltas[1].index;
        assert_ne!(first_index, second_index);

        let first: Vec<_> = deltas.iter().filter(|d| d.index == first_index).collect();
        assert_eq!(first[1].content.as_deref(), Some("a"));
        assert_eq!(first[2].status, Some(StageStatus::Completed));

        let second: Vec<_> = deltas.iter().filter(|d| d.index == second_index).collect();
        assert_eq!(second[1].content.as_deref(), Some("b"));
        assert_eq!(second[2].status, Some(StageStatus::Completed));
    }

    #[test]
    fn duplicate_completion_has_single_observable_effect() {
        let (mut tracker, mut receiver) = tracker();
        tracker.update(&StageDelta::open(0, "once"));
        tracker.update(&StageDelta::completed(0));
        tracker.update(&StageDelta::completed(0));
        tracker.update(&StageDelta::content(0, "late"));

        let deltas = stage_deltas(drain(&mut receiver));
        assert_eq!(deltas.len(), 2); // open + one completion
    }

    #[test]
    fn completion_for_unknown_index_is_ignored() {
        let (mut tracker, mut receiver) = tracker();
        tracker.update(&StageDelta::completed(42));

        assert!(tracker.is_empty());
        assert!(drain(&mut receiver).is_empty());
    }

    #[test]
    fn close_all_closes_only_open_stages() {
        let (mut tracker, mut receiver) = tracker();
        tracker.update(&StageDelta::open(0, "left open"));
        tracker.update(&StageDelta::open(1, "closed upstream"));
        tracker.update(&StageDelta::completed(1));
        tracker.close_all();

        let deltas = stage_deltas(drain(&mut receiver));
        let completions = deltas
            .iter()
            .filter(|d| d.status == Some(StageStatus::Completed))
            .count();
        assert_eq!(completions, 2);
    }
}
