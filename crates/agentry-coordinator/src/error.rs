use agentry::{LlmError, StateError};
use thiserror::Error;

/// Structured error type for the orchestration crate.
///
/// Most faults never reach the caller: routing errors fall back to the
/// default agent, synthesis errors fall back to the delegate's reply and
/// stage-lifecycle errors are swallowed. What remains is cancellation and
/// transport failures from the coordinator's own LLM calls.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoordinatorError {
    /// The surrounding request was cancelled; no further output follows.
    #[error("request cancelled")]
    Cancelled,

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("conversation state rejected: {0}")]
    State(#[from] StateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_converts() {
        let err: CoordinatorError = LlmError::Provider("boom".to_string()).into();
        assert!(matches!(err, CoordinatorError::Llm(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn state_error_converts() {
        let err: CoordinatorError = StateError::UnrecognizedShape("no tag".to_string()).into();
        assert!(err.to_string().contains("no tag"));
    }
}
