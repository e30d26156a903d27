//! SOC Investigator CLI support
//!
//! Configuration loading, logging setup and the command implementations
//! behind the `soc-investigator` binary.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod config;
pub mod logging;

pub use config::{AppConfig, PathsConfig};
pub use logging::LogFormat;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
