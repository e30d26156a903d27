//! Query sanitizer
//!
//! `sanitize` is pure and deterministic:
//! 1. truncate to the character bound
//! 2. strip markup and control characters
//! 3. replace each adversarial match with [`REDACTION_TOKEN`]
//! 4. trim, then re-apply the bound (redaction can lengthen the text)

use crate::patterns::{ADVERSARIAL_PATTERNS, COMPILED, REDACTION_TOKEN, SCANNER};

/// Default maximum query length, in characters
pub const DEFAULT_MAX_CHARS: usize = 1000;

/// Markup characters that could alter downstream prompt formatting
const STRIPPED_MARKUP: [char; 3] = ['`', '#', '*'];

/// Sanitizer for raw analyst queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryGuard {
    max_chars: usize,
}

impl QueryGuard {
    /// Create guard with the default 1000-character bound
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    /// With a custom character bound
    #[inline]
    #[must_use]
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Get the character bound
    #[inline]
    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Sanitize a raw query
    ///
    /// Matches are replaced rather than deleted so the surrounding text keeps
    /// its structure for logging.
    #[must_use]
    pub fn sanitize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let stripped: String = truncate_chars(text, self.max_chars)
            .chars()
            .filter(|c| !is_stripped(*c))
            .collect();

        let mut redacted = stripped;
        for pattern in COMPILED.iter() {
            if pattern.is_match(&redacted) {
                redacted = pattern.replace_all(&redacted, REDACTION_TOKEN).into_owned();
            }
        }

        truncate_chars(redacted.trim(), self.max_chars).to_owned()
    }

    /// Check for adversarial patterns without mutating the text
    #[inline]
    #[must_use]
    pub fn is_suspicious(&self, text: &str) -> bool {
        SCANNER.is_match(text)
    }

    /// List the patterns that match, in pattern-list order
    #[must_use]
    pub fn matched_patterns(&self, text: &str) -> Vec<&'static str> {
        SCANNER
            .matches(text)
            .into_iter()
            .map(|idx| ADVERSARIAL_PATTERNS[idx])
            .collect()
    }
}

impl Default for QueryGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn is_stripped(c: char) -> bool {
    STRIPPED_MARKUP.contains(&c) || (c.is_control() && c != '\n' && c != '\t')
}

/// Prefix of at most `max` characters, cut on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
