//! Persisted run state
//!
//! All files the engine and the recovery commands share live in one state
//! directory. Besides the ledger this holds the transient markers: the run
//! descriptor used by `resume`, the position hint and the pause sentinel.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "completed_targets.txt";
pub const POSITION_FILE: &str = ".scan_position";
pub const RUN_STATE_FILE: &str = ".scan_state.json";
pub const PAUSE_SENTINEL: &str = ".pause_scan";

/// Format used for per-run artefact names
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl crate::core::error_handling::ContextualError for StateError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, StateError::Corrupt { .. })
    }
}

pub type StateResult<T> = Result<T, StateError>;

/// Locations of every persisted file under one state directory
#[derive(Debug, Clone)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn position(&self) -> PathBuf {
        self.root.join(POSITION_FILE)
    }

    pub fn run_state(&self) -> PathBuf {
        self.root.join(RUN_STATE_FILE)
    }

    pub fn pause_sentinel(&self) -> PathBuf {
        self.root.join(PAUSE_SENTINEL)
    }

    /// Transient markers cleared by `reset` and captured by `backup`
    pub fn transient_files(&self) -> Vec<PathBuf> {
        vec![self.position(), self.run_state(), self.pause_sentinel()]
    }

    /// `<root>/<prefix>_<stamp>.<ext>`, suffixed `_1`, `_2`, ... if taken
    pub fn unique_artifact(&self, prefix: &str, ext: &str, at: DateTime<Local>) -> PathBuf {
        unique_path(&self.root, prefix, ext, &at.format(STAMP_FORMAT).to_string())
    }

    pub fn ensure_root(&self) -> StateResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| StateError::io(&self.root, e))
    }
}

fn unique_path(dir: &Path, prefix: &str, ext: &str, stamp: &str) -> PathBuf {
    let mut candidate = if ext.is_empty() {
        dir.join(format!("{prefix}_{stamp}"))
    } else {
        dir.join(format!("{prefix}_{stamp}.{ext}"))
    };
    let mut n = 1;
    while candidate.exists() {
        candidate = if ext.is_empty() {
            dir.join(format!("{prefix}_{stamp}_{n}"))
        } else {
            dir.join(format!("{prefix}_{stamp}_{n}.{ext}"))
        };
        n += 1;
    }
    candidate
}

/// Descriptor of the active scan, written by `run` and read by `resume`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub target_file: PathBuf,
    pub secret: String,
    pub started_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(target_file: impl Into<PathBuf>, secret: impl Into<String>) -> Self {
        Self {
            target_file: target_file.into(),
            secret: secret.into(),
            started_at: Utc::now(),
        }
    }

    /// Persist with owner-only permissions; the secret is stored in clear
    pub fn save(&self, paths: &StatePaths) -> StateResult<()> {
        let path = paths.run_state();
        let json = serde_json::to_string_pretty(self).map_err(|e| StateError::Corrupt {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path).map_err(|e| StateError::io(&path, e))?;
        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| StateError::io(&path, e))?;
        }
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| StateError::io(&path, e))
    }

    /// `Ok(None)` when no run has been started in this state directory
    pub fn load(paths: &StatePaths) -> StateResult<Option<Self>> {
        let path = paths.run_state();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::io(&path, e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: path.display().to_string(),
                source: e,
            })
    }
}

/// Record the target being processed when the scheduler suspended
pub fn write_position(paths: &StatePaths, target_id: &str) -> StateResult<()> {
    let path = paths.position();
    std::fs::write(&path, format!("{target_id}\n")).map_err(|e| StateError::io(&path, e))
}

/// The last position hint, if any; never authoritative over the ledger
pub fn read_position(paths: &StatePaths) -> Option<String> {
    std::fs::read_to_string(paths.position())
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn clear_position(paths: &StatePaths) -> StateResult<()> {
    remove_if_exists(&paths.position())
}

pub(crate) fn remove_if_exists(path: &Path) -> StateResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StateError::io(path, e)),
    }
}
