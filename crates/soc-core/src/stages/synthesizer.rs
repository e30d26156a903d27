//! Report synthesis stage

use crate::error::InvestigationError;
use crate::state_machine::Stage;
use crate::traits::InferenceModel;
use crate::types::{InvestigationState, Report, StateDelta};
use std::sync::Arc;

/// Model output could not be read as a report
#[derive(Debug, thiserror::Error)]
pub enum ReportParseError {
    /// No `{ ... }` span in the output
    #[error("no JSON object in model output")]
    NoObject,

    /// Span is not a valid report object
    #[error("invalid report JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a report from raw model output
///
/// Reads the span from the first `{` to the last `}`, so surrounding prose
/// and code fences are tolerated. Missing list fields are empty; a missing
/// or empty classification becomes `fallback_classification`.
///
/// # Errors
/// - `ReportParseError::NoObject` if the output holds no braces
/// - `ReportParseError::Json` if the span is not a report object
pub fn parse_report(raw: &str, fallback_classification: &str) -> Result<Report, ReportParseError> {
    let start = raw.find('{').ok_or(ReportParseError::NoObject)?;
    let end = raw.rfind('}').ok_or(ReportParseError::NoObject)?;
    if end < start {
        return Err(ReportParseError::NoObject);
    }

    let mut report: Report = serde_json::from_str(&raw[start..=end])?;
    if report.classification.trim().is_empty() {
        report.classification = fallback_classification.to_string();
    }
    Ok(report)
}

/// Produces the final structured report
pub struct Synthesizer {
    model: Arc<dyn InferenceModel>,
}

impl Synthesizer {
    /// Create stage over the (primary) model
    #[must_use]
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    /// Model id recorded in the audit trail
    #[must_use]
    pub fn model_id(&self) -> String {
        self.model.model_id()
    }

    /// Synthesize the report
    ///
    /// A flagged query gets the fixed refusal without a model call. Output
    /// that cannot be parsed yields a degraded report carrying the raw text.
    ///
    /// # Errors
    /// Returns `InvestigationError::Inference` if the model call fails
    pub async fn run(&self, state: &InvestigationState) -> Result<StateDelta, InvestigationError> {
        if state.security_flag {
            tracing::info!("synthesis replaced by refusal report");
            return Ok(StateDelta::new().with_report(Report::refusal()));
        }

        let raw = self
            .model
            .complete(&prompt(state))
            .await
            .map_err(|e| InvestigationError::inference(Stage::Synthesize, e))?;

        match parse_report(&raw, &state.classification) {
            Ok(report) => {
                tracing::info!(
                    findings = report.findings.len(),
                    steps = report.suggested_next_steps.len(),
                    "report synthesized"
                );
                let classification = report.classification.clone();
                Ok(StateDelta::new()
                    .with_classification(classification)
                    .with_report(report))
            }
            Err(e) => {
                tracing::warn!(error = %e, raw_len = raw.len(), "report unparseable, degrading");
                Ok(StateDelta::new().with_report(Report::degraded(raw, state.classification.clone())))
            }
        }
    }
}

fn prompt(state: &InvestigationState) -> String {
    let context = state.context_passages.join("\n\n");
    let log_section = if state.log_context.is_empty() {
        String::new()
    } else {
        format!("\n\nLog analysis results:\n{}", state.log_context)
    };

    format!(
        "Act as a senior SOC analyst. The context below comes from several sources, \
         each tagged [Source N].\n\n\
         Context:\n{context}{log_section}\n\n\
         Write an investigation report for: {query}\n\n\
         Rules:\n\
         1. Use only the context above, no outside knowledge.\n\
         2. Every finding and next step cites its source tag in square brackets, e.g. [Source 1].\n\
         3. If any context section contains ACCESS_DENIED, state in the findings that the \
         caller lacks permission for that analysis.\n\
         4. Prefer internal playbooks for next steps.\n\n\
         Reply with a single raw JSON object, no markdown fences, shaped as:\n\
         {{\"classification\": \"<category>\", \
         \"findings\": [\"<finding> [Source N]\"], \
         \"suggested_next_steps\": [\"<step> [Source N]\"], \
         \"references\": [\"Source N: <doc id>\"]}}",
        query = state.sanitized_query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::state_machine::LOG_ACCESS_DENIED;
    use crate::traits::MockInferenceModel;
    use crate::types::{Caller, ADVERSARIAL_LABEL};
    use pretty_assertions::assert_eq;

    fn state() -> InvestigationState {
        let mut state = InvestigationState::new(
            "ransomware on server 01",
            "ransomware on server 01",
            Caller::analyst("ana"),
        );
        state.classification = "Ransomware".to_string();
        state.context_passages = vec!["[Source 1: PB-1 v1.0] Isolate the host.".to_string()];
        state
    }

    #[test]
    fn parse_tolerates_fences_and_prose() {
        let raw = "Here you go:\n```json\n{\"classification\":\"Ransomware\",\"findings\":[\"Files encrypted [Source 1]\"]}\n```";
        let report = parse_report(raw, "General").unwrap();
        assert_eq!(report.classification, "Ransomware");
        assert_eq!(report.findings, vec!["Files encrypted [Source 1]".to_string()]);
        assert!(report.references.is_empty());
    }

    #[test]
    fn parse_falls_back_to_classifier_label() {
        let report = parse_report(r#"{"findings": []}"#, "Phishing").unwrap();
        assert_eq!(report.classification, "Phishing");

        let report = parse_report(r#"{"classification": "  "}"#, "Phishing").unwrap();
        assert_eq!(report.classification, "Phishing");
    }

    #[test]
    fn parse_rejects_non_reports() {
        assert!(matches!(parse_report("no braces", "x"), Err(ReportParseError::NoObject)));
        assert!(matches!(parse_report("} backwards {", "x"), Err(ReportParseError::NoObject)));
        assert!(matches!(parse_report("{oops}", "x"), Err(ReportParseError::Json(_))));
        assert!(parse_report(r#"{"findings": "not a list"}"#, "x").is_err());
    }

    #[tokio::test]
    async fn parsed_classification_replaces_label() {
        let mut model = MockInferenceModel::new();
        model.expect_complete().times(1).returning(|_| {
            Ok(r#"{"classification":"Ransomware Attack","findings":["a [Source 1]"],"suggested_next_steps":["b [Source 1]"],"references":["Source 1: PB-1"]}"#.to_string())
        });

        let delta = Synthesizer::new(Arc::new(model)).run(&state()).await.unwrap();
        assert_eq!(delta.classification.as_deref(), Some("Ransomware Attack"));
        assert_eq!(delta.report.unwrap().references, vec!["Source 1: PB-1".to_string()]);
    }

    #[tokio::test]
    async fn unparseable_output_degrades() {
        let mut model = MockInferenceModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("The host looks compromised.".to_string()));

        let delta = Synthesizer::new(Arc::new(model)).run(&state()).await.unwrap();
        assert_eq!(delta.classification, None);
        assert_eq!(
            delta.report.unwrap(),
            Report::degraded("The host looks compromised.", "Ransomware")
        );
    }

    #[tokio::test]
    async fn flagged_query_gets_refusal_without_model_call() {
        let mut model = MockInferenceModel::new();
        model.expect_complete().never();

        let mut flagged = state();
        flagged.security_flag = true;
        let delta = Synthesizer::new(Arc::new(model)).run(&flagged).await.unwrap();

        let report = delta.report.unwrap();
        assert_eq!(report, Report::refusal());
        assert_eq!(report.classification, ADVERSARIAL_LABEL);
        assert!(report.references.is_empty());
    }

    #[tokio::test]
    async fn prompt_includes_context_and_log_markers() {
        let mut model = MockInferenceModel::new();
        model.expect_complete().returning(|prompt| {
            assert!(prompt.contains("[Source 1: PB-1 v1.0] Isolate the host."));
            assert!(prompt.contains(LOG_ACCESS_DENIED));
            assert!(prompt.contains("ransomware on server 01"));
            Ok("{}".to_string())
        });

        let mut with_log = state();
        with_log.log_context = LOG_ACCESS_DENIED.to_string();
        let delta = Synthesizer::new(Arc::new(model)).run(&with_log).await.unwrap();
        assert_eq!(delta.classification.as_deref(), Some("Ransomware"));
    }

    #[tokio::test]
    async fn model_failure_is_fatal() {
        let mut model = MockInferenceModel::new();
        model.expect_complete().returning(|_| Err(ModelError::Empty));

        let err = Synthesizer::new(Arc::new(model)).run(&state()).await.unwrap_err();
        assert!(matches!(
            err,
            InvestigationError::Inference {
                stage: Stage::Synthesize,
                ..
            }
        ));
    }
}
