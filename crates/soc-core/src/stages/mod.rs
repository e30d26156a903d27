//! Pipeline stages
//!
//! Each stage reads the current [`InvestigationState`](crate::InvestigationState)
//! and returns a [`StateDelta`](crate::StateDelta). Stages make at most one
//! collaborator call and never retry.

pub mod classifier;
pub mod log_gate;
pub mod retriever;
pub mod synthesizer;

pub use classifier::Classifier;
pub use log_gate::LogGate;
pub use retriever::{citation_label, RetrievalStage};
pub use synthesizer::{parse_report, ReportParseError, Synthesizer};
