//! Core types for the investigation pipeline
//!
//! Defines:
//! - Caller identity and role
//! - Incident categories
//! - Retrieved passages and audit chunks
//! - The structured report
//! - Investigation state, per-stage deltas and the final result

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label the classifier emits for adversarial queries
pub const ADVERSARIAL_LABEL: &str = "Malicious/Jailbreak";

/// Caller role supplied by the transport/auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May run log analysis and read every audit record
    Admin,
    /// Knowledge-base investigations only
    Analyst,
}

impl Role {
    /// Check if role is admin
    #[inline]
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Lowercase wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Analyst => "analyst",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}', expected 'admin' or 'analyst'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "analyst" => Ok(Self::Analyst),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// User name
    pub user: String,
    /// Role
    pub role: Role,
}

impl Caller {
    /// Create caller
    #[inline]
    #[must_use]
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
        }
    }

    /// Admin caller
    #[inline]
    #[must_use]
    pub fn admin(user: impl Into<String>) -> Self {
        Self::new(user, Role::Admin)
    }

    /// Analyst caller
    #[inline]
    #[must_use]
    pub fn analyst(user: impl Into<String>) -> Self {
        Self::new(user, Role::Analyst)
    }
}

/// Known incident categories
///
/// Classification itself stays free text: labels outside this set are kept
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Repeated credential guessing
    BruteForce,
    /// Encryption-for-extortion malware
    Ransomware,
    /// Social engineering via messages
    Phishing,
    /// Other malicious software
    Malware,
    /// Anything else
    General,
    /// Prompt injection or jailbreak attempt
    Adversarial,
}

impl Category {
    /// All categories in prompt order
    pub const ALL: [Self; 6] = [
        Self::BruteForce,
        Self::Ransomware,
        Self::Phishing,
        Self::Malware,
        Self::General,
        Self::Adversarial,
    ];

    /// Display label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BruteForce => "Brute Force",
            Self::Ransomware => "Ransomware",
            Self::Phishing => "Phishing",
            Self::Malware => "Malware",
            Self::General => "General",
            Self::Adversarial => ADVERSARIAL_LABEL,
        }
    }

    /// Category for an exact label
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Citation metadata attached to a knowledge-base passage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Source document id
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub doc_id: Option<String>,
    /// Source document version
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub version: Option<String>,
    /// Any further metadata, preserved for audit
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl PassageMetadata {
    /// Metadata with id and version
    #[must_use]
    pub fn new(doc_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            doc_id: Some(doc_id.into()),
            version: Some(version.into()),
            extra: IndexMap::new(),
        }
    }

    /// Document id, `N/A` when absent
    #[inline]
    #[must_use]
    pub fn doc_id_or_default(&self) -> &str {
        self.doc_id.as_deref().unwrap_or("N/A")
    }

    /// Version, `1.0` when absent
    #[inline]
    #[must_use]
    pub fn version_or_default(&self) -> &str {
        self.version.as_deref().unwrap_or("1.0")
    }
}

/// Accept strings and numbers (`"2.1"` or `2.1`) for citation fields
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Passage returned by a knowledge retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text
    pub content: String,
    /// Citation metadata
    pub metadata: PassageMetadata,
}

impl RetrievedPassage {
    /// Create passage
    #[inline]
    #[must_use]
    pub fn new(content: impl Into<String>, metadata: PassageMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Retrieved passage as recorded for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Citation label (`Source N`)
    pub label: String,
    /// Passage text
    pub content: String,
    /// Citation metadata
    pub metadata: PassageMetadata,
}

/// Structured investigation report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Category label
    #[serde(default)]
    pub classification: String,
    /// Findings, each citing a source
    #[serde(default)]
    pub findings: Vec<String>,
    /// Recommended next steps
    #[serde(default)]
    pub suggested_next_steps: Vec<String>,
    /// Referenced sources
    #[serde(default)]
    pub references: Vec<String>,
}

impl Report {
    /// Fixed refusal issued when the jailbreak guardrail trips
    #[must_use]
    pub fn refusal() -> Self {
        Self {
            classification: ADVERSARIAL_LABEL.to_string(),
            findings: vec![
                "The submitted query triggered security guardrails. System instructions \
                 cannot be overridden and internal prompts are not accessible."
                    .to_string(),
            ],
            suggested_next_steps: vec![
                "Review the internal security policy on acceptable AI usage.".to_string(),
                "Contact your administrator if you believe this is a mistake.".to_string(),
            ],
            references: Vec::new(),
        }
    }

    /// Report carrying unparseable model output as its only finding
    #[must_use]
    pub fn degraded(raw: impl Into<String>, classification: impl Into<String>) -> Self {
        Self {
            classification: classification.into(),
            findings: vec![raw.into()],
            suggested_next_steps: Vec::new(),
            references: Vec::new(),
        }
    }
}

/// State threaded through the pipeline
///
/// Stages never mutate a state; they return a [`StateDelta`] that is merged
/// into a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestigationState {
    /// Query as submitted
    pub original_query: String,
    /// Query after sanitization
    pub sanitized_query: String,
    /// Who asked
    pub caller: Caller,
    /// Category label, empty until classified
    pub classification: String,
    /// Set once the query is classified as adversarial
    pub security_flag: bool,
    /// Log analysis summary or marker, empty if the branch was skipped
    pub log_context: String,
    /// Labeled passages for the synthesis prompt
    pub context_passages: Vec<String>,
    /// Retrieved passages for audit
    pub retrieved_chunks: Vec<RetrievedChunk>,
    /// Final report, `None` until synthesized
    pub report: Option<Report>,
}

impl InvestigationState {
    /// Initial state for a run
    #[must_use]
    pub fn new(
        original_query: impl Into<String>,
        sanitized_query: impl Into<String>,
        caller: Caller,
    ) -> Self {
        Self {
            original_query: original_query.into(),
            sanitized_query: sanitized_query.into(),
            caller,
            classification: String::new(),
            security_flag: false,
            log_context: String::new(),
            context_passages: Vec::new(),
            retrieved_chunks: Vec::new(),
            report: None,
        }
    }

    /// Merge a stage delta; the security flag can only be raised
    #[must_use]
    pub fn merge(self, delta: StateDelta) -> Self {
        Self {
            classification: delta.classification.unwrap_or(self.classification),
            security_flag: self.security_flag || delta.security_flag,
            log_context: delta.log_context.unwrap_or(self.log_context),
            context_passages: delta.context_passages.unwrap_or(self.context_passages),
            retrieved_chunks: delta.retrieved_chunks.unwrap_or(self.retrieved_chunks),
            report: delta.report.or(self.report),
            ..self
        }
    }
}

/// Fields a stage sets; `None` leaves the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    /// New classification
    pub classification: Option<String>,
    /// Raise the security flag
    pub security_flag: bool,
    /// New log context
    pub log_context: Option<String>,
    /// New context passages
    pub context_passages: Option<Vec<String>>,
    /// New retrieved chunks
    pub retrieved_chunks: Option<Vec<RetrievedChunk>>,
    /// New report
    pub report: Option<Report>,
}

impl StateDelta {
    /// Empty delta
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With classification
    #[inline]
    #[must_use]
    pub fn with_classification(mut self, label: impl Into<String>) -> Self {
        self.classification = Some(label.into());
        self
    }

    /// With security flag raised (`false` is a no-op on merge)
    #[inline]
    #[must_use]
    pub fn with_security_flag(mut self, flag: bool) -> Self {
        self.security_flag = flag;
        self
    }

    /// With log context
    #[inline]
    #[must_use]
    pub fn with_log_context(mut self, log_context: impl Into<String>) -> Self {
        self.log_context = Some(log_context.into());
        self
    }

    /// With context passages and their audit chunks
    #[inline]
    #[must_use]
    pub fn with_context(mut self, passages: Vec<String>, chunks: Vec<RetrievedChunk>) -> Self {
        self.context_passages = Some(passages);
        self.retrieved_chunks = Some(chunks);
        self
    }

    /// With report
    #[inline]
    #[must_use]
    pub fn with_report(mut self, report: Report) -> Self {
        self.report = Some(report);
        self
    }
}

/// Outcome of a run; also the cached payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationResult {
    /// Final category label
    pub classification: String,
    /// Structured report
    pub report: Report,
    /// Labeled passages plus the log-analysis source when applicable
    pub sources: Vec<String>,
    /// Retrieved passages
    pub retrieved_chunks: Vec<RetrievedChunk>,
}
