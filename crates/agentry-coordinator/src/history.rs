//! Conversation-history shaping for the coordinator's own LLM calls.

use agentry::{Message, Role};

/// Build the outgoing message array for a routing or synthesis call:
/// system prompt first, then the transcript with orchestration metadata
/// stripped from user turns (attachments, state and stages are internal
/// bookkeeping and only mislead the model).
pub(crate) fn prepare_llm_messages(history: &[Message], system_prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(system_prompt));
    for msg in history {
        if msg.role == Role::User && msg.custom_content.is_some() {
            messages.push(msg.without_custom_content());
        } else {
            messages.push(msg.clone());
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry::{Attachment, CustomContent};

    #[test]
    fn system_prompt_leads_the_array() {
        let history = vec![Message::user("hi")];
        let messages = prepare_llm_messages(&history, "be helpful");
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text(), "be helpful");
        assert_eq!(messages[1].text(), "hi");
    }

    #[test]
    fn user_metadata_is_stripped_but_assistant_metadata_survives() {
        let history = vec![
            Message {
                role: Role::User,
                content: Some("analyze this".to_string()),
                custom_content: Some(CustomContent {
                    attachments: Some(vec![Attachment::default()]),
                    state: None,
                    stages: None,
                }),
            },
            Message {
                role: Role::Assistant,
                content: Some("done".to_string()),
                custom_content: Some(CustomContent {
                    attachments: None,
                    state: Some(serde_json::json!({"agent": "ums", "conversation_id": "c-1"})),
                    stages: None,
                }),
            },
        ];
        let messages = prepare_llm_messages(&history, "prompt");
        assert!(messages[1].custom_content.is_none());
        assert!(messages[2].custom_content.is_some());
    }
}
