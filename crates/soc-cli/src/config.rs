//! Application configuration
//!
//! Loaded from a TOML file (every section optional), then overridden by
//! `SOC_*` environment variables for secrets and paths.
//!
//! ```toml
//! [provider]
//! base_url = "https://api.openai.com/v1"
//! chat_model = "gpt-4o"
//!
//! [investigator]
//! cache_threshold = 0.9
//! top_k = 3
//!
//! [paths]
//! audit_log = "data/audit_log.json"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use soc_core::InvestigatorConfig;
use soc_providers::ProviderConfig;
use std::path::{Path, PathBuf};

/// File locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// SQLite semantic cache
    pub cache_db: PathBuf,
    /// JSON audit trail
    pub audit_log: PathBuf,
    /// Authentication session log
    pub auth_log: PathBuf,
    /// JSONL knowledge base
    pub knowledge_base: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_db: PathBuf::from("data/semantic_cache.db"),
            audit_log: PathBuf::from("data/audit_log.json"),
            auth_log: PathBuf::from("data/raw_logs/logs.json"),
            knowledge_base: PathBuf::from("data/knowledge_base.jsonl"),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model endpoint
    pub provider: ProviderConfig,
    /// Pipeline tuning
    pub investigator: InvestigatorConfig,
    /// File locations
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not a valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load `path` (defaults when `None`) and apply the process environment
    ///
    /// # Errors
    /// Returns an error if an explicit file cannot be read or parsed, or an
    /// override has an invalid value
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("in config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SOC_*` overrides read through `lookup`
    ///
    /// # Errors
    /// Returns an error if a numeric override does not parse
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let provider = &mut self.provider;
        if let Some(v) = lookup("SOC_API_KEY") {
            provider.api_key = Some(v);
        }
        if let Some(v) = lookup("SOC_BASE_URL") {
            provider.base_url = v;
        }
        if let Some(v) = lookup("SOC_CHAT_MODEL") {
            provider.chat_model = v;
        }
        if let Some(v) = lookup("SOC_FAST_CHAT_MODEL") {
            provider.fast_chat_model = v;
        }
        if let Some(v) = lookup("SOC_EMBEDDING_MODEL") {
            provider.embedding_model = v;
        }
        if let Some(v) = lookup("SOC_TIMEOUT_SECS") {
            provider.timeout_secs = v
                .parse()
                .with_context(|| format!("SOC_TIMEOUT_SECS must be an integer, got '{v}'"))?;
        }

        let paths = &mut self.paths;
        for (key, slot) in [
            ("SOC_CACHE_DB", &mut paths.cache_db),
            ("SOC_AUDIT_LOG", &mut paths.audit_log),
            ("SOC_AUTH_LOG", &mut paths.auth_log),
            ("SOC_KNOWLEDGE_BASE", &mut paths.knowledge_base),
        ] {
            if let Some(v) = lookup(key) {
                *slot = PathBuf::from(v);
            }
        }
        Ok(())
    }
}
