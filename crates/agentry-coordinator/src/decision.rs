//! Routing decision model.

use agentry::{AgentName, StructuredOutputFormat};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

/// Routing decision produced once per request; immutable.
///
/// The field doc comments double as the schema descriptions sent to the
/// model, so they are phrased as instructions rather than documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoordinationDecision {
    /// The agent that must handle the request. Use "ums" for operations on
    /// system users (search, create, update, delete, list); use "gpa" for
    /// everything else: web search, document analysis, calculations, code
    /// execution and image generation.
    pub agent_name: AgentName,

    /// Optional clarifying instructions for the chosen agent, e.g. filters
    /// extracted from the conversation or disambiguation of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
}

impl CoordinationDecision {
    /// The policy fallback applied when the model's reply is unusable: the
    /// general-purpose agent with no extra instructions.
    pub fn fallback() -> Self {
        Self {
            agent_name: AgentName::Gpa,
            additional_instructions: None,
        }
    }

    /// Response-format constraint sent to the LLM provider.
    pub fn response_format() -> StructuredOutputFormat {
        StructuredOutputFormat {
            name: "coordination_decision".to_string(),
            description: Some("Routing decision for the multi-agent coordinator".to_string()),
            schema: serde_json::to_value(schema_for!(CoordinationDecision)).ok(),
            strict: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_targets_the_general_purpose_agent() {
        let decision = CoordinationDecision::fallback();
        assert_eq!(decision.agent_name, AgentName::Gpa);
        assert!(decision.additional_instructions.is_none());
    }

    #[test]
    fn deserializes_both_agent_values() {
        let ums: CoordinationDecision =
            serde_json::from_str(r#"{"agent_name": "ums"}"#).unwrap();
        assert_eq!(ums.agent_name, AgentName::Ums);

        let gpa: CoordinationDecision = serde_json::from_str(
            r#"{"agent_name": "gpa", "additional_instructions": "use the uploaded CSV"}"#,
        )
        .unwrap();
        assert_eq!(gpa.agent_name, AgentName::Gpa);
        assert_eq!(
            gpa.additional_instructions.as_deref(),
            Some("use the uploaded CSV")
        );
    }

    #[test]
    fn rejects_agents_outside_the_known_set() {
        assert!(serde_json::from_str::<CoordinationDecision>(r#"{"agent_name": "scheduler"}"#).is_err());
        assert!(serde_json::from_str::<CoordinationDecision>(r#"{}"#).is_err());
    }

    #[test]
    fn response_format_embeds_the_schema() {
        let format = CoordinationDecision::response_format();
        assert_eq!(format.name, "coordination_decision");
        let schema = format.schema.expect("schema present");
        let text = schema.to_string();
        assert!(text.contains("agent_name"));
        assert!(text.contains("additional_instructions"));
    }
}
