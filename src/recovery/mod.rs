//! Recovery Tooling
//!
//! Offline commands over the persisted files. None of these coordinate with a
//! live scan; running them while a scan is writing the ledger is a caller
//! error.

pub mod backup;

pub use backup::{backup, BackupReport, ManifestEntry};

use crate::core::error_handling::ContextualError;
use crate::core::styles::StyleRole;
use crate::ledger::file::read_entries;
use crate::ledger::{
    dedup_preserving_order, FileLedger, Ledger, LedgerAnomaly, LedgerError, ResetConfirmation,
};
use crate::state::{read_position, RunState, StateError, StatePaths};
use crate::targets::{TargetError, TargetList};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// How many ids the status view lists on each side
pub const STATUS_PREVIEW: usize = 5;

/// Default output of `remaining`
pub const REMAINING_FILE: &str = "remaining_targets.txt";

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("No target list given and no previous run recorded in {dir}")]
    NoTargetList { dir: String },

    #[error("Ledger {path} does not exist")]
    MissingLedger { path: String },

    #[error("Nothing to back up in {dir}")]
    NothingToBackup { dir: String },

    #[error(transparent)]
    Targets(#[from] TargetError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backup manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl RecoveryError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        RecoveryError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl ContextualError for RecoveryError {
    fn is_user_actionable(&self) -> bool {
        match self {
            RecoveryError::NoTargetList { .. }
            | RecoveryError::MissingLedger { .. }
            | RecoveryError::NothingToBackup { .. } => true,
            RecoveryError::Targets(e) => e.is_user_actionable(),
            RecoveryError::State(e) => e.is_user_actionable(),
            RecoveryError::Ledger(_) | RecoveryError::Io { .. } | RecoveryError::Manifest(_) => {
                false
            }
        }
    }
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// The explicit target file, else the one recorded by the last `run`
pub fn resolve_target_file(paths: &StatePaths, explicit: Option<&Path>) -> RecoveryResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    RunState::load(paths)?
        .map(|state| state.target_file)
        .ok_or_else(|| RecoveryError::NoTargetList {
            dir: paths.root().display().to_string(),
        })
}

/// Snapshot of progress for the `status` command
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub total: usize,
    /// Completed ids that are in the target list
    pub completed: usize,
    pub pending: Vec<String>,
    /// Most recent ledger entries, oldest first
    pub last_completed: Vec<String>,
    /// Ledger ids absent from the target list
    pub orphaned: usize,
    pub paused: bool,
    pub position: Option<String>,
}

impl StatusReport {
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }

    pub fn next_pending(&self) -> &[String] {
        &self.pending[..self.pending.len().min(STATUS_PREVIEW)]
    }

    pub fn render(&self, color: bool) -> String {
        let key = |k: &str| StyleRole::Key.paint(k, color);
        let mut out = String::new();
        out.push_str(&StyleRole::Header.paint("Scan status", color));
        out.push('\n');
        out.push_str(&format!("  {} {}\n", key("Targets:     "), self.total));
        out.push_str(&format!(
            "  {} {} ({:.1}%)\n",
            key("Completed:   "),
            StyleRole::Success.paint(&self.completed.to_string(), color),
            self.percent_complete()
        ));
        out.push_str(&format!(
            "  {} {}\n",
            key("Remaining:   "),
            self.pending.len()
        ));
        let state = if self.paused {
            StyleRole::Waiting.paint("paused (marker present)", color)
        } else {
            StyleRole::Dim.paint("not paused", color)
        };
        out.push_str(&format!("  {} {}\n", key("Pause:       "), state));
        if let Some(position) = &self.position {
            out.push_str(&format!(
                "  {} {}\n",
                key("Last stop:   "),
                StyleRole::Target.paint(position, color)
            ));
        }
        if self.orphaned > 0 {
            out.push_str(&format!(
                "  {} {}\n",
                key("Not in list: "),
                StyleRole::Failure.paint(&self.orphaned.to_string(), color)
            ));
        }
        if !self.last_completed.is_empty() {
            out.push_str(&StyleRole::Header.paint("Last completed", color));
            out.push('\n');
            for id in &self.last_completed {
                out.push_str(&format!("    {}\n", StyleRole::Target.paint(id, color)));
            }
        }
        if !self.pending.is_empty() {
            out.push_str(&StyleRole::Header.paint("Next pending", color));
            out.push('\n');
            for id in self.next_pending() {
                out.push_str(&format!("    {}\n", StyleRole::Target.paint(id, color)));
            }
        }
        out
    }
}

/// Progress of `targets` against the ledger in `paths`
pub fn status(paths: &StatePaths, targets: &TargetList) -> RecoveryResult<StatusReport> {
    let entries = dedup_preserving_order(&read_entries(&paths.ledger())?);
    let done: HashSet<&str> = entries.iter().map(String::as_str).collect();
    let listed: HashSet<&str> = targets.ids().collect();

    let pending: Vec<String> = targets
        .ids()
        .filter(|id| !done.contains(id))
        .map(str::to_string)
        .collect();
    let completed = targets.len() - pending.len();
    let orphaned = entries
        .iter()
        .filter(|id| !listed.contains(id.as_str()))
        .count();
    let last_completed = entries[entries.len().saturating_sub(STATUS_PREVIEW)..].to_vec();

    Ok(StatusReport {
        total: targets.len(),
        completed,
        pending,
        last_completed,
        orphaned,
        paused: paths.pause_sentinel().exists(),
        position: read_position(paths),
    })
}

/// Write every pending target as `id:creds` to `output`; returns the count
pub fn remaining(paths: &StatePaths, targets: &TargetList, output: &Path) -> RecoveryResult<usize> {
    let done: HashSet<String> = read_entries(&paths.ledger())?.into_iter().collect();
    let mut body = String::new();
    let mut count = 0;
    for record in targets.iter().filter(|r| !done.contains(&r.id)) {
        body.push_str(&record.id);
        body.push(':');
        body.push_str(&record.credentials.join(","));
        body.push('\n');
        count += 1;
    }
    std::fs::write(output, body).map_err(|e| RecoveryError::io(output, e))?;
    log::info!("Wrote {} pending targets to {}", count, output.display());
    Ok(count)
}

/// Outcome of `verify`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Findings before repair
    pub anomalies: Vec<LedgerAnomaly>,
    pub duplicates_removed: usize,
}

impl VerifyReport {
    pub fn malformed(&self) -> impl Iterator<Item = &LedgerAnomaly> {
        self.anomalies
            .iter()
            .filter(|a| matches!(a, LedgerAnomaly::Malformed { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Report anomalies, then rewrite the ledger without duplicates
pub fn verify(paths: &StatePaths) -> RecoveryResult<VerifyReport> {
    let path = paths.ledger();
    if !path.exists() {
        return Err(RecoveryError::MissingLedger {
            path: path.display().to_string(),
        });
    }
    let mut ledger = FileLedger::open(path)?;
    let anomalies = ledger.verify()?;
    let duplicates_removed = ledger.deduplicate()?;
    Ok(VerifyReport {
        anomalies,
        duplicates_removed,
    })
}

/// Ask on `output`, read the answer from `input`; true if the state was cleared
pub fn reset<R: BufRead, W: Write>(
    paths: &StatePaths,
    input: &mut R,
    output: &mut W,
) -> RecoveryResult<bool> {
    let prompt_err = |e| RecoveryError::io(Path::new("<stdin>"), e);
    write!(
        output,
        "This deletes {} and all run markers in {}.\nType 'yes' to continue: ",
        paths.ledger().display(),
        paths.root().display()
    )
    .and_then(|_| output.flush())
    .map_err(prompt_err)?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(prompt_err)?;

    let Some(confirmation) = ResetConfirmation::from_answer(&answer) else {
        writeln!(output, "Reset cancelled").map_err(prompt_err)?;
        return Ok(false);
    };
    FileLedger::open_in(paths)?.reset(confirmation)?;
    writeln!(output, "Scan state cleared").map_err(prompt_err)?;
    log::info!("Reset state in {}", paths.root().display());
    Ok(true)
}
