//! Log analysis gate
//!
//! Second layer of log gating: the branch predicate decides whether this
//! stage runs at all, the gate decides whether the analyzer is called.

use crate::state_machine::LogGateDecision;
use crate::traits::LogAnalyzer;
use crate::types::{InvestigationState, StateDelta};
use std::sync::Arc;

/// Default offender threshold passed to the analyzer
pub const DEFAULT_OFFENDER_THRESHOLD: u32 = 50;

/// Gated call into the log analyzer
pub struct LogGate {
    analyzer: Arc<dyn LogAnalyzer>,
    threshold: u32,
}

impl LogGate {
    /// Create gate with the default offender threshold
    #[must_use]
    pub fn new(analyzer: Arc<dyn LogAnalyzer>) -> Self {
        Self {
            analyzer,
            threshold: DEFAULT_OFFENDER_THRESHOLD,
        }
    }

    /// With offender threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set `log_context` to a marker or the analyzer summary
    pub async fn run(&self, state: &InvestigationState) -> StateDelta {
        let decision = LogGateDecision::evaluate(state.security_flag, state.caller.role);
        if let Some(marker) = decision.marker() {
            tracing::info!(?decision, user = %state.caller.user, "log scan gated");
            return StateDelta::new().with_log_context(marker);
        }

        let summary = self.analyzer.analyze(self.threshold).await;
        tracing::info!(threshold = self.threshold, bytes = summary.len(), "log scan complete");
        StateDelta::new().with_log_context(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{LOG_ACCESS_DENIED, LOG_SCAN_ABORTED};
    use crate::traits::MockLogAnalyzer;
    use crate::types::Caller;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn state(caller: Caller, flagged: bool) -> InvestigationState {
        let mut state = InvestigationState::new("brute force", "brute force", caller);
        state.security_flag = flagged;
        state
    }

    #[tokio::test]
    async fn flag_aborts_before_role_check() {
        let mut analyzer = MockLogAnalyzer::new();
        analyzer.expect_analyze().never();
        let gate = LogGate::new(Arc::new(analyzer));

        let delta = gate.run(&state(Caller::admin("root"), true)).await;
        assert_eq!(delta.log_context.as_deref(), Some(LOG_SCAN_ABORTED));
    }

    #[tokio::test]
    async fn analyst_is_denied() {
        let mut analyzer = MockLogAnalyzer::new();
        analyzer.expect_analyze().never();
        let gate = LogGate::new(Arc::new(analyzer));

        let delta = gate.run(&state(Caller::analyst("ana"), false)).await;
        assert_eq!(delta.log_context.as_deref(), Some(LOG_ACCESS_DENIED));
    }

    #[tokio::test]
    async fn admin_gets_summary_verbatim() {
        let mut analyzer = MockLogAnalyzer::new();
        analyzer
            .expect_analyze()
            .with(eq(DEFAULT_OFFENDER_THRESHOLD))
            .times(1)
            .returning(|_| "- IP: 10.0.0.9 | Attempts: 120".to_string());
        let gate = LogGate::new(Arc::new(analyzer));

        let delta = gate.run(&state(Caller::admin("root"), false)).await;
        assert_eq!(delta.log_context.as_deref(), Some("- IP: 10.0.0.9 | Attempts: 120"));
    }

    #[tokio::test]
    async fn custom_threshold_is_passed_through() {
        let mut analyzer = MockLogAnalyzer::new();
        analyzer
            .expect_analyze()
            .with(eq(5))
            .times(1)
            .returning(|_| String::new());
        let gate = LogGate::new(Arc::new(analyzer)).with_threshold(5);

        let _ = gate.run(&state(Caller::admin("root"), false)).await;
    }
}
