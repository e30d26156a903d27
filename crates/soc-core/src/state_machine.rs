//! Investigation state machine
//!
//! ```text
//! Classify ──(log branch)──► LogScan ──► Retrieve ──► Synthesize ──► Done
//!     └──────────(skip)────────────────────┘
//! ```
//!
//! Branching and gating are pure functions over the state so they can be
//! tested without collaborators. The graph is acyclic and every stage runs
//! at most once.

use crate::error::StateMachineError;
use crate::types::{InvestigationState, Role};
use serde::Serialize;
use std::fmt;

/// Marker set when the log scan is skipped for a flagged query
pub const LOG_SCAN_ABORTED: &str = "LOG_SCAN_ABORTED: Security flags detected.";

/// Marker set when a non-admin reaches the log scan
pub const LOG_ACCESS_DENIED: &str = "ACCESS_DENIED: Log analysis requires ADMIN privileges.";

/// Placeholder passage for a flagged query
pub const RETRIEVAL_BLOCKED: &str =
    "ACCESS_DENIED: Critical security guardrail triggered. Retrieval blocked.";

/// Query terms that route through the log scan
pub const LOG_BRANCH_TERMS: [&str; 4] = ["log", "brute force", "attempts", "ip"];

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Classify the query
    Classify,
    /// Gated authentication log analysis
    LogScan,
    /// Knowledge-base retrieval
    Retrieve,
    /// Report synthesis
    Synthesize,
    /// Terminal
    Done,
}

impl Stage {
    /// Entry stage
    pub const ENTRY: Self = Self::Classify;

    /// Stage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::LogScan => "log_scan",
            Self::Retrieve => "retrieve",
            Self::Synthesize => "synthesize",
            Self::Done => "done",
        }
    }

    /// Check if stage is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages reachable from `stage`
#[must_use]
pub fn allowed_transitions(stage: Stage) -> &'static [Stage] {
    match stage {
        Stage::Classify => &[Stage::LogScan, Stage::Retrieve],
        Stage::LogScan => &[Stage::Retrieve],
        Stage::Retrieve => &[Stage::Synthesize],
        Stage::Synthesize => &[Stage::Done],
        Stage::Done => &[],
    }
}

/// Check an edge against the graph
///
/// # Errors
/// Returns `StateMachineError::IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// Branch predicate: does the query ask about logs?
///
/// Case-insensitive substring match on the sanitized query only; the
/// classification and security flag play no part. `ip` matches inside
/// words too (`shipping` routes through the gate).
#[must_use]
pub fn should_scan_logs(sanitized_query: &str) -> bool {
    let query = sanitized_query.to_lowercase();
    LOG_BRANCH_TERMS.iter().any(|term| query.contains(term))
}

/// Successor of `current`, `None` after `Done`
#[must_use]
pub fn next_stage(current: Stage, state: &InvestigationState) -> Option<Stage> {
    match current {
        Stage::Classify if should_scan_logs(&state.sanitized_query) => Some(Stage::LogScan),
        Stage::Classify | Stage::LogScan => Some(Stage::Retrieve),
        Stage::Retrieve => Some(Stage::Synthesize),
        Stage::Synthesize => Some(Stage::Done),
        Stage::Done => None,
    }
}

/// In-stage log gate outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogGateDecision {
    /// Flagged query, analyzer not called
    Abort,
    /// Caller is not an admin, analyzer not called
    Deny,
    /// Call the analyzer
    Scan,
}

impl LogGateDecision {
    /// Decide the gate; the security flag takes precedence over the role
    #[must_use]
    pub fn evaluate(security_flag: bool, role: Role) -> Self {
        if security_flag {
            Self::Abort
        } else if !role.is_admin() {
            Self::Deny
        } else {
            Self::Scan
        }
    }

    /// Marker text replacing the summary, `None` when scanning
    #[must_use]
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::Abort => Some(LOG_SCAN_ABORTED),
            Self::Deny => Some(LOG_ACCESS_DENIED),
            Self::Scan => None,
        }
    }
}

/// Walk of one investigation through the graph
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: Stage,
    visited: Vec<Stage>,
}

impl StageTracker {
    /// Start at the entry stage
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Stage::ENTRY,
            visited: vec![Stage::ENTRY],
        }
    }

    /// Current stage
    #[inline]
    #[must_use]
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Stages entered so far, in order
    #[inline]
    #[must_use]
    pub fn visited(&self) -> &[Stage] {
        &self.visited
    }

    /// Move to `to`
    ///
    /// The graph is acyclic, so rejecting edges outside it also rules out
    /// running a stage twice.
    ///
    /// # Errors
    /// `StateMachineError::IllegalTransition` for an edge outside the graph
    pub fn advance(&mut self, to: Stage) -> Result<(), StateMachineError> {
        validate_transition(self.current, to)?;
        self.visited.push(to);
        self.current = to;
        Ok(())
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Caller;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn state(query: &str) -> InvestigationState {
        InvestigationState::new(query, query, Caller::analyst("ana"))
    }

    #[test]
    fn branch_predicate_matches_terms_case_insensitively() {
        assert!(should_scan_logs("Brute Force on VPN"));
        assert!(should_scan_logs("check the LOGS"));
        assert!(should_scan_logs("failed login attempts"));
        assert!(should_scan_logs("suspicious IP 10.0.0.1"));
        assert!(should_scan_logs("zip archive from the shipping team"));
        assert!(!should_scan_logs("phishing email"));
        assert!(!should_scan_logs("ransomware on server 01"));
    }

    #[test]
    fn classify_branches_on_query_only() {
        assert_eq!(next_stage(Stage::Classify, &state("brute force")), Some(Stage::LogScan));
        assert_eq!(next_stage(Stage::Classify, &state("ransomware")), Some(Stage::Retrieve));

        let mut flagged = state("ransomware");
        flagged.security_flag = true;
        assert_eq!(next_stage(Stage::Classify, &flagged), Some(Stage::Retrieve));
    }

    #[test]
    fn remaining_edges_are_unconditional() {
        let s = state("anything");
        assert_eq!(next_stage(Stage::LogScan, &s), Some(Stage::Retrieve));
        assert_eq!(next_stage(Stage::Retrieve, &s), Some(Stage::Synthesize));
        assert_eq!(next_stage(Stage::Synthesize, &s), Some(Stage::Done));
        assert_eq!(next_stage(Stage::Done, &s), None);
    }

    #[test]
    fn graph_has_no_back_edges() {
        assert!(validate_transition(Stage::Classify, Stage::LogScan).is_ok());
        assert!(validate_transition(Stage::Classify, Stage::Retrieve).is_ok());
        assert_eq!(
            validate_transition(Stage::Retrieve, Stage::Classify),
            Err(StateMachineError::IllegalTransition {
                from: Stage::Retrieve,
                to: Stage::Classify,
            })
        );
        assert!(validate_transition(Stage::Classify, Stage::Synthesize).is_err());
        assert!(allowed_transitions(Stage::Done).is_empty());
    }

    #[test]
    fn gate_precedence() {
        assert_eq!(LogGateDecision::evaluate(true, Role::Admin), LogGateDecision::Abort);
        assert_eq!(LogGateDecision::evaluate(true, Role::Analyst), LogGateDecision::Abort);
        assert_eq!(LogGateDecision::evaluate(false, Role::Analyst), LogGateDecision::Deny);
        assert_eq!(LogGateDecision::evaluate(false, Role::Admin), LogGateDecision::Scan);

        assert!(LogGateDecision::Abort.marker().unwrap().starts_with("LOG_SCAN_ABORTED:"));
        assert!(LogGateDecision::Deny.marker().unwrap().starts_with("ACCESS_DENIED:"));
        assert_eq!(LogGateDecision::Scan.marker(), None);
    }

    #[test]
    fn tracker_follows_graph() {
        let mut tracker = StageTracker::new();
        tracker.advance(Stage::LogScan).unwrap();
        tracker.advance(Stage::Retrieve).unwrap();
        tracker.advance(Stage::Synthesize).unwrap();
        tracker.advance(Stage::Done).unwrap();

        assert!(tracker.current().is_terminal());
        assert_eq!(
            tracker.visited(),
            &[
                Stage::Classify,
                Stage::LogScan,
                Stage::Retrieve,
                Stage::Synthesize,
                Stage::Done
            ]
        );
        assert_eq!(
            tracker.advance(Stage::Classify),
            Err(StateMachineError::IllegalTransition {
                from: Stage::Done,
                to: Stage::Classify,
            })
        );
    }

    #[test]
    fn back_edges_are_rejected() {
        let mut tracker = StageTracker::new();
        tracker.advance(Stage::Retrieve).unwrap();
        assert!(tracker.advance(Stage::Retrieve).is_err());
        assert!(tracker.advance(Stage::LogScan).is_err());
        assert_eq!(tracker.visited(), &[Stage::Classify, Stage::Retrieve]);
    }

    proptest! {
        #[test]
        fn every_walk_terminates_on_a_valid_path(query in ".{0,200}") {
            let state = state(&query);
            let mut tracker = StageTracker::new();
            let mut current = Stage::Classify;
            while let Some(next) = next_stage(current, &state) {
                prop_assert!(tracker.advance(next).is_ok());
                current = next;
            }

            prop_assert_eq!(current, Stage::Done);
            prop_assert_eq!(
                tracker.visited().contains(&Stage::LogScan),
                should_scan_logs(&query)
            );
        }
    }
}
