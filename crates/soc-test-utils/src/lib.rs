//! Testing utilities for the SOC investigator workspace
//!
//! Deterministic stand-ins for every collaborator plus a fixture that wires
//! them into an [`Investigator`] with in-memory cache and audit stores.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use soc_cache::{EmbedError, Embedder, MemoryCacheStore, SemanticCache};
use soc_core::{
    Collaborators, InferenceModel, Investigator, InvestigatorConfig, KnowledgeRetriever,
    LogAnalyzer, MemoryAuditSink, ModelError, PassageMetadata, RetrievalError, RetrievedPassage,
    ADVERSARIAL_LABEL,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Well-formed report naming one cited finding and step
pub const SAMPLE_REPORT: &str = r#"{"classification":"Ransomware","findings":["Files renamed with a .locked extension [Source 1]"],"suggested_next_steps":["Isolate the affected host [Source 1]"],"references":["Source 1: PB-RANSOM-01"]}"#;

/// Log summary returned by [`CountingLogAnalyzer::default`]
pub const SAMPLE_LOG_SUMMARY: &str = "--- Log Analysis Summary: Brute Force Detection ---\n\
Total Login Attempts Processed: 540\n\
Unique Source IPs: 3\n\n\
Top Offending IPs (attempts >= 50):\n\
- IP: 192.168.1.105 | Attempts: 500 | Targeted Users: root\n";

enum Script {
    Reply(String),
    Fail(ModelError),
    Keywords,
}

/// Inference model with a scripted answer that records every prompt
pub struct ScriptedModel {
    id: String,
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Always answer `reply`
    pub fn replying(id: &str, reply: impl Into<String>) -> Self {
        Self::with_script(id, Script::Reply(reply.into()))
    }

    /// Always fail with `error`
    pub fn failing(id: &str, error: ModelError) -> Self {
        Self::with_script(id, Script::Fail(error))
    }

    /// Classify by keyword: redacted patterns are adversarial, then
    /// ransomware, brute force/ssh, phishing; otherwise `General`
    pub fn keyword_classifier(id: &str) -> Self {
        Self::with_script(id, Script::Keywords)
    }

    fn with_script(id: &str, script: Script) -> Self {
        Self {
            id: id.to_string(),
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions requested
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompts received, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

/// Query line of a classification prompt, or the whole text
fn query_line(prompt: &str) -> &str {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Alert or question: "))
        .unwrap_or(prompt)
}

fn keyword_label(prompt: &str) -> &'static str {
    let prompt = query_line(prompt).to_lowercase();
    if prompt.contains("[redacted_security_pattern]") {
        ADVERSARIAL_LABEL
    } else if prompt.contains("ransomware") {
        "Ransomware"
    } else if prompt.contains("brute force") || prompt.contains("ssh") {
        "Brute Force"
    } else if prompt.contains("phishing") {
        "Phishing"
    } else {
        "General"
    }
}

#[async_trait]
impl InferenceModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().push(prompt.to_string());
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail(error) => Err(error.clone()),
            Script::Keywords => Ok(keyword_label(prompt).to_string()),
        }
    }

    fn model_id(&self) -> String {
        self.id.clone()
    }
}

/// Bag-of-words hashing embedder
///
/// Identical texts embed identically; texts sharing most words score high.
pub struct HashEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    /// # Panics
    /// If `dimension` is zero
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be non-zero");
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of embed calls served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = usize::try_from(hasher.finish() % self.dimension as u64).unwrap_or(0);
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

/// Embedder that always fails
#[derive(Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Request("embedding service unavailable".to_string()))
    }
}

/// Retriever returning a fixed passage list
pub struct StaticRetriever {
    passages: Vec<RetrievedPassage>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            calls: AtomicUsize::new(0),
        }
    }

    /// Two ransomware playbook passages
    pub fn playbooks() -> Self {
        Self::new(vec![
            RetrievedPassage::new(
                "Ransomware: isolate the host and preserve memory before shutdown.",
                PassageMetadata::new("PB-RANSOM-01", "1.2"),
            ),
            RetrievedPassage::new(
                "Verify offline backups before any restore.",
                PassageMetadata::new("PB-BACKUP-02", "3.0"),
            ),
        ])
    }

    /// Number of retrieve calls served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

/// Log analyzer returning a fixed summary and recording thresholds
pub struct CountingLogAnalyzer {
    summary: String,
    thresholds: Mutex<Vec<u32>>,
}

impl CountingLogAnalyzer {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            thresholds: Mutex::new(Vec::new()),
        }
    }

    /// Number of analyze calls served
    pub fn calls(&self) -> usize {
        self.thresholds.lock().len()
    }

    /// Thresholds received, oldest first
    pub fn thresholds(&self) -> Vec<u32> {
        self.thresholds.lock().clone()
    }
}

impl Default for CountingLogAnalyzer {
    fn default() -> Self {
        Self::new(SAMPLE_LOG_SUMMARY)
    }
}

#[async_trait]
impl LogAnalyzer for CountingLogAnalyzer {
    async fn analyze(&self, threshold: u32) -> String {
        self.thresholds.lock().push(threshold);
        self.summary.clone()
    }
}

/// Investigator wired to fakes, with handles for assertions
pub struct InvestigatorFixture {
    pub investigator: Investigator,
    pub classifier: Arc<ScriptedModel>,
    pub synthesizer: Arc<ScriptedModel>,
    pub retriever: Arc<StaticRetriever>,
    pub log_analyzer: Arc<CountingLogAnalyzer>,
    pub audit: Arc<MemoryAuditSink>,
    pub cache_store: Arc<MemoryCacheStore>,
    pub embedder: Arc<HashEmbedder>,
}

/// Builder for [`InvestigatorFixture`]
pub struct FixtureBuilder {
    classifier: ScriptedModel,
    synthesizer: ScriptedModel,
    retriever: StaticRetriever,
    log_analyzer: CountingLogAnalyzer,
    config: InvestigatorConfig,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self {
            classifier: ScriptedModel::keyword_classifier("fast-test-model"),
            synthesizer: ScriptedModel::replying("test-model", SAMPLE_REPORT),
            retriever: StaticRetriever::playbooks(),
            log_analyzer: CountingLogAnalyzer::default(),
            config: InvestigatorConfig::default(),
        }
    }
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classifier(mut self, model: ScriptedModel) -> Self {
        self.classifier = model;
        self
    }

    pub fn synthesizer(mut self, model: ScriptedModel) -> Self {
        self.synthesizer = model;
        self
    }

    pub fn retriever(mut self, retriever: StaticRetriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn log_analyzer(mut self, analyzer: CountingLogAnalyzer) -> Self {
        self.log_analyzer = analyzer;
        self
    }

    pub fn config(mut self, config: InvestigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> InvestigatorFixture {
        let classifier = Arc::new(self.classifier);
        let synthesizer = Arc::new(self.synthesizer);
        let retriever = Arc::new(self.retriever);
        let log_analyzer = Arc::new(self.log_analyzer);
        let audit = Arc::new(MemoryAuditSink::new());
        let cache_store = Arc::new(MemoryCacheStore::new());
        let embedder = Arc::new(HashEmbedder::default());

        let investigator = Investigator::new(
            Collaborators {
                classifier_model: classifier.clone(),
                synthesis_model: synthesizer.clone(),
                retriever: retriever.clone(),
                log_analyzer: log_analyzer.clone(),
                audit: audit.clone(),
                cache: SemanticCache::new(cache_store.clone(), embedder.clone()),
            },
            self.config,
        );

        InvestigatorFixture {
            investigator,
            classifier,
            synthesizer,
            retriever,
            log_analyzer,
            audit,
            cache_store,
            embedder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("Suspected ransomware on server 01").await.unwrap();
        let b = embedder.embed("suspected RANSOMWARE on server 01").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(embedder.calls(), 2);
    }

    #[test]
    #[should_panic(expected = "embedding dimension must be non-zero")]
    fn hash_embedder_rejects_zero_dimension() {
        let _ = HashEmbedder::new(0);
    }

    #[tokio::test]
    async fn keyword_classifier_labels() {
        let model = ScriptedModel::keyword_classifier("m");
        assert_eq!(model.complete("ransomware here").await.unwrap(), "Ransomware");
        assert_eq!(
            model.complete("[REDACTED_SECURITY_PATTERN] now").await.unwrap(),
            ADVERSARIAL_LABEL
        );
        assert_eq!(model.complete("hello").await.unwrap(), "General");
        assert_eq!(model.calls(), 3);
    }
}
