//! Command implementations
//!
//! Each command returns the text to print; `main` only parses arguments
//! and writes output.

use crate::config::AppConfig;
use anyhow::{ensure, Context, Result};
use soc_cache::{SemanticCache, SqliteCacheStore};
use soc_core::{
    history, AuditSink, Caller, Collaborators, Investigator, JsonFileAuditSink, LogAnalyzer,
};
use soc_logscan::BruteForceLogAnalyzer;
use soc_providers::{LexicalRetriever, OpenAiCompatClient};
use std::sync::Arc;

/// Wire the production investigator from configuration
///
/// # Errors
/// Returns an error if the HTTP client, knowledge base or cache database
/// cannot be initialized
pub async fn build_investigator(config: &AppConfig) -> Result<Investigator> {
    let paths = &config.paths;

    let synthesis = OpenAiCompatClient::new(&config.provider).context("building model client")?;
    let classifier = synthesis.with_chat_model(config.provider.fast_chat_model.clone());

    let retriever = LexicalRetriever::from_jsonl(&paths.knowledge_base)
        .await
        .context("loading knowledge base")?;
    let store = SqliteCacheStore::open(&paths.cache_db)
        .with_context(|| format!("opening cache {}", paths.cache_db.display()))?;

    tracing::info!(
        chat_model = synthesis.chat_model(),
        fast_model = classifier.chat_model(),
        passages = retriever.len(),
        "investigator ready"
    );

    Ok(Investigator::new(
        Collaborators {
            classifier_model: Arc::new(classifier),
            cache: SemanticCache::new(Arc::new(store), Arc::new(synthesis.clone())),
            synthesis_model: Arc::new(synthesis),
            retriever: Arc::new(retriever),
            log_analyzer: Arc::new(BruteForceLogAnalyzer::new(&paths.auth_log)),
            audit: Arc::new(JsonFileAuditSink::new(&paths.audit_log)),
        },
        config.investigator.clone(),
    ))
}

/// Run one investigation and render the result as JSON
///
/// # Errors
/// Returns an error if the investigation fails
pub async fn investigate(investigator: &Investigator, query: &str, caller: &Caller) -> Result<String> {
    let result = investigator
        .run(query, caller)
        .await
        .context("investigation failed")?;
    Ok(serde_json::to_string_pretty(&result)?)
}

/// Render audit records as JSON, optionally for one user
///
/// Only admins may read the trail.
///
/// # Errors
/// Returns an error if `caller` is not an admin or the audit trail cannot
/// be read
pub fn audit(sink: &dyn AuditSink, caller: &Caller, user: Option<&str>) -> Result<String> {
    ensure!(
        caller.role.is_admin(),
        "access denied: reading the audit trail requires the admin role (caller '{}' is {})",
        caller.user,
        caller.role
    );
    let records = match user {
        Some(user) => sink.records_for_user(user),
        None => sink.records(),
    }
    .context("reading audit trail")?;
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Render the caller's recent history as JSON
///
/// # Errors
/// Returns an error if the audit trail cannot be read
pub fn recent_history(sink: &dyn AuditSink, caller: &Caller, limit: usize) -> Result<String> {
    let records = history(sink, caller, limit).context("reading audit trail")?;
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Run the log analyzer directly
pub async fn scan_logs(analyzer: &dyn LogAnalyzer, threshold: u32) -> String {
    analyzer.analyze(threshold).await
}
