//! SOC Investigator Core
//!
//! Guarded, multi-stage investigation of free-text incident queries:
//! - Sanitizes the query and consults the semantic cache
//! - Classifies the incident and raises a security flag on jailbreaks
//! - Gates authentication log analysis on the flag and the caller role
//! - Retrieves labeled knowledge-base passages
//! - Synthesizes a cited JSON report and appends an audit record
//!
//! # Example
//!
//! ```rust,ignore
//! use soc_core::{Caller, Collaborators, Investigator, InvestigatorConfig};
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), soc_core::InvestigationError> {
//! let investigator = Investigator::new(collaborators, InvestigatorConfig::default());
//!
//! let result = investigator
//!     .run("Suspected ransomware on server 01", &Caller::analyst("ana"))
//!     .await?;
//! println!("{}: {} findings", result.classification, result.report.findings.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod audit;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stages;
pub mod state_machine;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use audit::{
    history, AuditRecord, AuditSink, JsonFileAuditSink, MemoryAuditSink, DEFAULT_HISTORY_LIMIT,
};
pub use config::InvestigatorConfig;
pub use error::{
    AuditError, InvestigationError, ModelError, RetrievalError, StateMachineError,
};
pub use pipeline::{assemble_sources, Collaborators, Investigator, LOG_ANALYSIS_SOURCE};
pub use stages::{parse_report, ReportParseError};
pub use state_machine::{
    allowed_transitions, next_stage, should_scan_logs, validate_transition, LogGateDecision,
    Stage, StageTracker, LOG_ACCESS_DENIED, LOG_SCAN_ABORTED, RETRIEVAL_BLOCKED,
};
pub use traits::{InferenceModel, KnowledgeRetriever, LogAnalyzer};
pub use types::{
    Caller, Category, InvestigationResult, InvestigationState, ParseRoleError, PassageMetadata,
    Report, RetrievedChunk, RetrievedPassage, Role, StateDelta, ADVERSARIAL_LABEL,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the investigator
    pub use crate::{
        AuditSink, Caller, Collaborators, InferenceModel, InvestigationError,
        InvestigationResult, Investigator, InvestigatorConfig, KnowledgeRetriever, LogAnalyzer,
        Report, Role,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
