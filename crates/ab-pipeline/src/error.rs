//! Pipeline error taxonomy.
//!
//! The orchestrator is the single place errors are caught and translated
//! into these categories; validators accumulate error strings instead of
//! returning `Err`, and the history store swallows its own failures.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The prompt failed moderation/validation. Terminal, never retried.
    #[error("prompt rejected: {0}")]
    Rejected(String),

    /// A stage produced zero usable results.
    #[error("{0}")]
    StageFatal(String),

    /// The generation service returned an error or was unreachable.
    #[error("generation service error: {0}")]
    Service(String),

    /// Polling for a request's result exceeded the stage timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The service reply did not contain the expected JSON payload.
    #[error("unparseable service reply: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// User-initiated abort. Distinct from every failure category.
    #[error("generation cancelled by user")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Short human-readable failure string for the host UI, classified by
    /// matching known status codes and substrings in the underlying error.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Rejected(reason) => {
                format!("Your prompt was not accepted: {reason}")
            }
            PipelineError::Cancelled => "Generation cancelled.".to_string(),
            PipelineError::Timeout(_) => {
                "The design service took too long to respond. Please try again.".to_string()
            }
            PipelineError::Service(detail) => {
                let lower = detail.to_lowercase();
                if lower.contains("429") || lower.contains("rate limit") {
                    "The design service is busy right now. Please wait a moment and try again."
                        .to_string()
                } else if lower.contains("401")
                    || lower.contains("403")
                    || lower.contains("api key")
                    || lower.contains("unauthorized")
                {
                    "The design service rejected our credentials. Check the API configuration."
                        .to_string()
                } else {
                    "Something went wrong while generating your design. Please try again."
                        .to_string()
                }
            }
            _ => "Something went wrong while generating your design. Please try again.".to_string(),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Service(_) | PipelineError::Timeout(_) | PipelineError::Parse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detected_from_substring() {
        let err = PipelineError::Service("HTTP 429 Too Many Requests".into());
        assert!(err.user_message().contains("busy"));
    }

    #[test]
    fn auth_failure_detected() {
        let err = PipelineError::Service("invalid API key".into());
        assert!(err.user_message().contains("credentials"));
    }

    #[test]
    fn cancellation_message_is_distinct() {
        let cancelled = PipelineError::Cancelled.user_message();
        let generic = PipelineError::Service("boom".into()).user_message();
        let rejected = PipelineError::Rejected("off-topic".into()).user_message();
        assert_ne!(cancelled, generic);
        assert_ne!(cancelled, rejected);
    }

    #[test]
    fn rejection_carries_reason_verbatim() {
        let err = PipelineError::Rejected("not a design request".into());
        assert!(err.user_message().contains("not a design request"));
    }
}
