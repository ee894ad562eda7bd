//! Command-line arguments
//!
//! Global flags apply to every subcommand. Scan tuning flags are shared by
//! `run` and `resume` and override the configuration file.

use crate::core::validation::validate_positive_int;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "credsweep")]
#[command(about = "Resumable, rate-limited credential validation across many hosts")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Directory holding the ledger and run markers
    #[arg(short = 'd', long = "state-dir", value_name = "DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Force coloured output
    #[arg(short = 'g', long = "color", global = true, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
          value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true,
          value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// More output (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less output (repeatable)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Start a fresh scan over a target file
    Run {
        /// Normalized target file (`id:user1,user2` per line)
        #[arg(value_name = "TARGET_SOURCE")]
        target_source: PathBuf,

        /// Secret tested with every credential
        #[arg(value_name = "SECRET")]
        secret: String,

        #[command(flatten)]
        scan: ScanOverrides,
    },

    /// Continue the scan recorded in the state directory
    Resume {
        /// Overrides the stored secret
        #[arg(value_name = "SECRET")]
        secret: Option<String>,

        #[command(flatten)]
        scan: ScanOverrides,
    },

    /// Show progress against the target list
    Status {
        #[command(flatten)]
        targets: TargetsArg,
    },

    /// Write the pending targets to a file
    Remaining {
        #[command(flatten)]
        targets: TargetsArg,

        /// Output file (default: remaining_targets.txt in the state directory)
        #[arg(short = 'O', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Report ledger anomalies and remove duplicate entries
    Verify,

    /// Delete the ledger and run markers (asks for confirmation)
    Reset,

    /// Copy the ledger, target list and run markers to a timestamped directory
    Backup {
        #[command(flatten)]
        targets: TargetsArg,
    },

    /// Convert a scanner CSV export (IP, Results columns) into a target file
    Ingest {
        /// CSV export to read
        #[arg(value_name = "CSV")]
        csv: PathBuf,

        /// Target file to write (default: stdout)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Run { .. } => "run",
            Command::Resume { .. } => "resume",
            Command::Status { .. } => "status",
            Command::Remaining { .. } => "remaining",
            Command::Verify => "verify",
            Command::Reset => "reset",
            Command::Backup { .. } => "backup",
            Command::Ingest { .. } => "ingest",
        }
    }

    pub fn scan_overrides(&self) -> Option<&ScanOverrides> {
        match self {
            Command::Run { scan, .. } | Command::Resume { scan, .. } => Some(scan),
            _ => None,
        }
    }
}

/// Target list for offline commands; defaults to the one recorded by `run`
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct TargetsArg {
    #[arg(short = 't', long = "targets", value_name = "FILE")]
    pub targets: Option<PathBuf>,
}

/// Per-invocation overrides of the `[scan]`, `[health]` and `[tester]` settings
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct ScanOverrides {
    /// Maximum credentials per tester invocation
    #[arg(short = 'b', long = "batch-size", value_name = "COUNT", value_parser = validate_positive_int)]
    pub batch_size: Option<usize>,

    /// Seconds between batches of the same target
    #[arg(long = "batch-delay", value_name = "SECONDS")]
    pub batch_delay: Option<u64>,

    /// Per-attempt timeout in seconds
    #[arg(short = 'T', long = "timeout", value_name = "SECONDS")]
    pub attempt_timeout: Option<u64>,

    /// Thread count handed to the tester
    #[arg(long = "threads", value_name = "COUNT", value_parser = validate_positive_int)]
    pub threads: Option<usize>,

    /// Network interface that must be up
    #[arg(short = 'i', long = "interface", value_name = "NAME")]
    pub interface: Option<String>,

    /// Skip network health checks
    #[arg(long = "no-health-check")]
    pub no_health_check: bool,
}
