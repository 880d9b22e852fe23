//! Wire-level message model shared by the coordinator and its backends.
//!
//! Both backend protocols speak a chat-completion message shape: a plain
//! `role`/`content` pair plus an optional `custom_content` envelope carrying
//! attachments, opaque per-agent state and nested progress stages. Messages
//! are immutable once appended to a conversation transcript; the transcript
//! itself is owned by the caller, not by this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_content: Option<CustomContent>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            custom_content: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            custom_content: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            custom_content: None,
        }
    }

    /// The text content, or the empty string when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// The raw state blob from custom content, if any.
    pub fn state(&self) -> Option<&Value> {
        self.custom_content.as_ref()?.state.as_ref()
    }

    /// A copy with everything but the plain text stripped.
    pub fn without_custom_content(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
            custom_content: None,
        }
    }
}

/// Orchestrator/agent metadata travelling outside the plain text content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StageDelta>>,
}

impl CustomContent {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_none() && self.state.is_none() && self.stages.is_none()
    }
}

/// A file or data payload referenced from a message or a stage.
///
/// Exactly one of `data`/`url` is expected to be meaningful. The MIME type
/// travels under the wire name `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Lifecycle status of a progress stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Open,
    Completed,
}

/// Partial update to one progress stage.
///
/// Full stage state is the fold of all deltas sharing an `index`; `content`
/// is a cumulative append, never a replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDelta {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl StageDelta {
    /// A delta that opens a stage under `index` with the given name.
    pub fn open(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: Some(name.into()),
            status: Some(StageStatus::Open),
            content: None,
            attachments: None,
        }
    }

    /// A content-append delta.
    pub fn content(index: u32, content: impl Into<String>) -> Self {
        Self {
            index,
            name: None,
            status: None,
            content: Some(content.into()),
            attachments: None,
        }
    }

    /// A terminal delta closing the stage.
    pub fn completed(index: u32) -> Self {
        Self {
            index,
            name: None,
            status: Some(StageStatus::Completed),
            content: None,
            attachments: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_serializes_without_empty_fields() {
        let msg = Message::user("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn attachment_mime_type_uses_wire_name_type() {
        let att = Attachment {
            mime_type: Some("image/png".to_string()),
            title: Some("chart".to_string()),
            data: Some("iVBOR...".to_string()),
            url: None,
        };
        let value = serde_json::to_value(&att).unwrap();
        assert_eq!(value["type"], "image/png");
        assert!(value.get("mime_type").is_none());
    }

    #[test]
    fn stage_delta_round_trips() {
        let raw = json!({
            "index": 2,
            "name": "Searching",
            "status": "open",
            "content": "querying",
        });
        let delta: StageDelta = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(delta.index, 2);
        assert_eq!(delta.status, Some(StageStatus::Open));
        assert_eq!(serde_json::to_value(&delta).unwrap(), raw);
    }

    #[test]
    fn custom_content_survives_unknown_state_shape() {
        let raw = json!({
            "state": {"anything": [1, 2, 3]},
            "attachments": [{"type": "text/csv", "url": "http://example/x.csv"}],
        });
        let cc: CustomContent = serde_json::from_value(raw).unwrap();
        assert!(cc.state.is_some());
        assert_eq!(cc.attachments.as_ref().unwrap().len(), 1);
        assert!(!cc.is_empty());
    }

    #[test]
    fn without_custom_content_strips_metadata_only() {
        let msg = Message {
            role: Role::User,
            content: Some("look at this".to_string()),
            custom_content: Some(CustomContent {
                attachments: Some(vec![Attachment::default()]),
                state: None,
                stages: None,
            }),
        };
        let stripped = msg.without_custom_content();
        assert_eq!(stripped.text(), "look at this");
        assert!(stripped.custom_content.is_none());
    }
}
