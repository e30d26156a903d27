//! Adversarial phrase patterns
//!
//! Instruction overrides, system-prompt extraction, jailbreak aliases and
//! fake admin-mode claims. All matching is case-insensitive.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};

/// Token substituted for every adversarial match
pub const REDACTION_TOKEN: &str = "[REDACTED_SECURITY_PATTERN]";

/// Fixed adversarial pattern list, applied in order
pub const ADVERSARIAL_PATTERNS: &[&str] = &[
    r"ignore\s+(all\s+)?previous\s+instructions",
    r"system\s*prompt",
    r"you\s+are\s+now\s+an\s+evil",
    r"output\s+the\s+full\s+prompt",
    r"bypass\s+all\s+filters",
    r"dan\s+mode",
    r"jailbreak",
    r"administrator\s*mode",
];

/// Individually compiled patterns, used for in-place replacement
pub(crate) static COMPILED: Lazy<Vec<Regex>> = Lazy::new(|| {
    ADVERSARIAL_PATTERNS
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("adversarial pattern must compile")
        })
        .collect()
});

/// Single-pass scanner over the whole list
pub(crate) static SCANNER: Lazy<RegexSet> = Lazy::new(|| {
    RegexSetBuilder::new(ADVERSARIAL_PATTERNS)
        .case_insensitive(true)
        .build()
        .expect("adversarial pattern set must compile")
});
