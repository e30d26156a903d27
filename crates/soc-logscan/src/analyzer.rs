//! File-backed analyzer

use crate::summary::{BruteForceSummary, SessionEntry};
use async_trait::async_trait;
use soc_core::LogAnalyzer;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Session log could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File does not exist
    #[error("Log file not found at {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but cannot be read
    #[error("Error loading logs: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a JSON array of sessions
    #[error("Error loading logs: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Brute-force analyzer over a JSON session log
#[derive(Debug, Clone)]
pub struct BruteForceLogAnalyzer {
    path: PathBuf,
}

impl BruteForceLogAnalyzer {
    /// Analyzer reading `path` on every call
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Session log location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the session log
    ///
    /// # Errors
    /// - `LoadError::NotFound` if the file is missing
    /// - `LoadError::Io` if it cannot be read
    /// - `LoadError::Parse` if it is not a JSON array of sessions
    pub async fn load(&self) -> Result<Vec<SessionEntry>, LoadError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);
        Ok(serde_json::from_slice(body)?)
    }

    /// Load and aggregate the log
    ///
    /// # Errors
    /// Propagates [`load`](Self::load) failures
    pub async fn summarize(&self, threshold: u32) -> Result<BruteForceSummary, LoadError> {
        let entries = self.load().await?;
        Ok(BruteForceSummary::from_entries(&entries, threshold))
    }
}

#[async_trait]
impl LogAnalyzer for BruteForceLogAnalyzer {
    async fn analyze(&self, threshold: u32) -> String {
        match self.summarize(threshold).await {
            Ok(summary) => {
                tracing::info!(
                    path = %self.path.display(),
                    offenders = summary.offenders.len(),
                    total_attempts = summary.total_attempts,
                    "brute-force scan complete"
                );
                summary.to_string()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "log scan failed");
                e.to_string()
            }
        }
    }
}
