//! CLI argument definitions using clap
//!
//! - squad spawn <team> <name> --role R     # Register and launch a teammate
//! - squad poll <team> --wait               # Block until done, failed or timed out
//! - squad status/aggregate <team>          # Inspect a team
//! - squad shutdown <team> [--force]        # Tear a team down
//! - squad partition <targets-file|->       # Bucket targets by role or module
//! - squad post <team> <member> ...         # Teammate side of the mailbox protocol

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "squad_config.json";

#[derive(Parser, Debug)]
#[command(name = "squad")]
#[command(about = "Squad - coordinate a team of workers through file-backed mailboxes")]
#[command(
    long_about = r#"Squad - coordinate a team of workers through file-backed mailboxes

USAGE:
  squad partition targets.txt --by-role     # Preview how work would be split
  squad spawn alpha unit-1 --role unit-tester --targets unit.txt
  squad poll alpha --wait --timeout 600     # Exit 0 success, 1 failure, 2 timeout
  squad aggregate alpha --format json       # Merged results
  squad shutdown alpha --keep-results       # Graceful teardown with archive

Agent teams must be enabled with SQUAD_AGENT_TEAMS=1 or `"enabled": true`."#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,

    /// Override the directory holding team storage
    #[arg(long, global = true)]
    pub teams_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a teammate and hand it an assignment
    Spawn {
        /// Team name (created on first spawn)
        team: String,

        /// Member name, unique within the team
        name: String,

        /// Role of the new member
        #[arg(long)]
        role: String,

        /// Instructions passed to the teammate
        #[arg(long, default_value = "")]
        instructions: String,

        /// Targets file (JSON array or one `id<TAB>hint` per line)
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Reference paths the teammate should read (repeatable)
        #[arg(long = "reference")]
        references: Vec<PathBuf>,

        /// Command launching the teammate (overrides the configured executor command)
        #[arg(long)]
        command: Option<String>,
    },

    /// Report completion state, optionally waiting for the team to finish
    Poll {
        team: String,

        /// Block until every member completed, one failed, or the timeout elapsed
        #[arg(long)]
        wait: bool,

        /// Wait bound in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,

        /// Restrict to one member
        #[arg(long)]
        member: Option<String>,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show the registry record of a team next to what its mailboxes say
    Status {
        team: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Merge every member's results into one report
    Aggregate {
        team: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Shut a team down and remove its storage
    Shutdown {
        team: String,

        /// Skip the acknowledgement exchange
        #[arg(long)]
        force: bool,

        /// Archive the final report before removal
        #[arg(long)]
        keep_results: bool,

        /// Bound for collecting acknowledgements, in seconds
        #[arg(long)]
        ack_timeout: Option<u64>,
    },

    /// Split targets into buckets without spawning anything
    Partition {
        /// Targets file, or `-` for stdin
        input: String,

        /// Group by role (default)
        #[arg(long, conflicts_with = "by_module")]
        by_role: bool,

        /// Group by module path
        #[arg(long)]
        by_module: bool,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Post a message to a member's mailbox (teammate side)
    Post {
        team: String,

        member: String,

        #[command(subcommand)]
        message: PostMessage,
    },

    /// List known teams
    Teams {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PostMessage {
    /// Report successful completion
    Completed {
        /// Number of targets processed
        #[arg(long, default_value_t = 0)]
        processed: u64,

        /// Produced artifact (repeatable)
        #[arg(long = "artifact")]
        artifacts: Vec<String>,

        /// Metric as key=value; the value is parsed as JSON when possible (repeatable)
        #[arg(long = "metric", value_parser = parse_metric)]
        metrics: Vec<(String, serde_json::Value)>,

        /// Non-fatal error encountered along the way (repeatable)
        #[arg(long = "error")]
        errors: Vec<String>,
    },

    /// Report failure
    Failed {
        #[arg(long)]
        message: String,

        /// Artifact produced before the failure (repeatable)
        #[arg(long = "partial")]
        partial_artifacts: Vec<String>,
    },

    /// Acknowledge a shutdown request
    Ack {
        #[arg(long)]
        note: Option<String>,
    },

    /// Report progress
    Progress {
        #[arg(long)]
        count: u64,

        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn parse_metric(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("metric key is empty in '{raw}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
