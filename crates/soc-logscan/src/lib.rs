//! SOC Log Scan
//!
//! Reference [`LogAnalyzer`](soc_core::LogAnalyzer): counts failed
//! authentication attempts in a JSON session log and reports the source IPs
//! at or above an offender threshold.
//!
//! Input is a JSON array of sessions:
//!
//! ```json
//! [{"foreign_ip": "10.0.0.9", "username": "root", "passwords": ["123456", "admin"]}]
//! ```
//!
//! A session counts one attempt per password, or one attempt when the list
//! is missing or empty. Load failures are returned as summary text, never as
//! errors.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod analyzer;
pub mod summary;

pub use analyzer::{BruteForceLogAnalyzer, LoadError};
pub use summary::{BruteForceSummary, Offender, SessionEntry, MAX_OFFENDERS, MAX_TOP_USERS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
