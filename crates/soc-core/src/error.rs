//! Error types for the investigation core
//!
//! Only fatal conditions are errors here. Policy denials (log access, the
//! jailbreak guardrail) and recoverable failures (cache, report parsing,
//! unreadable logs) produce valid results instead.

use crate::state_machine::Stage;
use std::path::PathBuf;

/// Main investigation error type
#[derive(Debug, thiserror::Error)]
pub enum InvestigationError {
    /// A model call failed
    #[error("inference failed during {stage}: {source}")]
    Inference {
        /// Stage that issued the call
        stage: Stage,
        /// Underlying model error
        #[source]
        source: ModelError,
    },

    /// Knowledge retrieval failed
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Audit append failed
    #[error("audit failed: {0}")]
    Audit(#[from] AuditError),

    /// Pipeline left its transition graph
    #[error("state machine violation: {0}")]
    StateMachine(#[from] StateMachineError),
}

impl InvestigationError {
    /// Wrap a model error with the stage that raised it
    #[inline]
    #[must_use]
    pub fn inference(stage: Stage, source: ModelError) -> Self {
        Self::Inference { stage, source }
    }

    /// Check if a caller could reasonably retry the whole run
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Inference { source, .. } => source.is_transient(),
            Self::Retrieval(e) => matches!(e, RetrievalError::Backend(_)),
            Self::Audit(e) => matches!(e, AuditError::Io(_)),
            Self::StateMachine(_) => false,
        }
    }
}

/// Inference model errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Transport failure (connect, timeout, reset)
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Provider response did not have the expected shape
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// Provider returned no completion text
    #[error("provider returned no completion")]
    Empty,
}

impl ModelError {
    /// Transport failures, rate limits and server errors are transient
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::Empty => false,
        }
    }
}

/// Knowledge retriever errors
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Backend unavailable or failed the query
    #[error("retriever backend error: {0}")]
    Backend(String),

    /// Index could not be loaded
    #[error("retriever index error: {0}")]
    Index(String),
}

/// Audit sink errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Filesystem failure
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    /// Existing audit file is not a JSON array of records
    #[error("audit file {path} is corrupt: {source}")]
    Corrupt {
        /// Audit file location
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// Record could not be serialized
    #[error("audit serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Blocking append task panicked or was cancelled
    #[error("audit task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Pipeline transition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Edge not in the transition graph
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },

    /// Flagged run finished with model-generated or retrieved content
    #[error("guardrail violated: {0}")]
    GuardrailViolated(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_model_errors_are_retryable() {
        let err = InvestigationError::inference(
            Stage::Classify,
            ModelError::Transport("connection reset".into()),
        );
        assert!(err.is_retryable());
        assert!(err.to_string().contains("classify"));

        let rate_limited = ModelError::Status {
            status: 429,
            body: String::new(),
        };
        assert!(rate_limited.is_transient());

        let bad_request = ModelError::Status {
            status: 400,
            body: "bad".into(),
        };
        assert!(!InvestigationError::inference(Stage::Synthesize, bad_request).is_retryable());
    }

    #[test]
    fn state_machine_errors_are_not_retryable() {
        let err: InvestigationError = StateMachineError::IllegalTransition {
            from: Stage::Synthesize,
            to: Stage::Retrieve,
        }
        .into();
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "state machine violation: illegal transition synthesize -> retrieve"
        );
    }
}
