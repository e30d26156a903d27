//! `soc-investigator` binary entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use soc_cli::{commands, AppConfig, LogFormat};
use soc_core::{Caller, JsonFileAuditSink, Role, DEFAULT_HISTORY_LIMIT};
use soc_logscan::BruteForceLogAnalyzer;
use std::path::PathBuf;

/// Guarded SOC incident investigator
#[derive(Debug, Parser)]
#[command(name = "soc-investigator", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "SOC_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Investigate an incident query and print the report as JSON
    Investigate {
        /// Free-text incident query
        #[arg(long)]
        query: String,
        /// Caller user name
        #[arg(long)]
        user: String,
        /// Caller role (admin or analyst)
        #[arg(long, default_value = "analyst")]
        role: Role,
    },
    /// Print audit records (admin only)
    Audit {
        /// Caller user name
        #[arg(long)]
        user: String,
        /// Caller role (admin or analyst)
        #[arg(long, default_value = "analyst")]
        role: Role,
        /// Only records of this user
        #[arg(long)]
        only: Option<String>,
    },
    /// Print recent investigations visible to a caller
    History {
        /// Caller user name
        #[arg(long)]
        user: String,
        /// Caller role (admin or analyst)
        #[arg(long, default_value = "analyst")]
        role: Role,
        /// Number of records
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Run brute-force detection over the authentication log
    ScanLogs {
        /// Attempts at which a source IP is reported
        #[arg(long)]
        threshold: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    soc_cli::logging::init(cli.log_format)?;
    let config = AppConfig::load(cli.config.as_deref())?;

    let output = match cli.command {
        Command::Investigate { query, user, role } => {
            let investigator = commands::build_investigator(&config).await?;
            commands::investigate(&investigator, &query, &Caller::new(user, role)).await?
        }
        Command::Audit { user, role, only } => {
            let sink = JsonFileAuditSink::new(&config.paths.audit_log);
            commands::audit(&sink, &Caller::new(user, role), only.as_deref())?
        }
        Command::History { user, role, limit } => {
            let sink = JsonFileAuditSink::new(&config.paths.audit_log);
            commands::recent_history(&sink, &Caller::new(user, role), limit)?
        }
        Command::ScanLogs { threshold } => {
            let analyzer = BruteForceLogAnalyzer::new(&config.paths.auth_log);
            let threshold = threshold.unwrap_or(config.investigator.offender_threshold);
            commands::scan_logs(&analyzer, threshold).await
        }
    };

    println!("{output}");
    Ok(())
}
