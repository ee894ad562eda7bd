//! Timestamped snapshot of the ledger, target list and run markers

use super::{RecoveryError, RecoveryResult};
use crate::state::StatePaths;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One copied file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub source: PathBuf,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    created_at: DateTime<Local>,
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub dir: PathBuf,
    pub files: Vec<ManifestEntry>,
}

/// Copy every persisted file that exists into `backup_<stamp>/`
///
/// The target list is included when given. Fails if there is nothing at all
/// to copy.
pub fn backup(
    paths: &StatePaths,
    target_file: Option<&Path>,
    at: DateTime<Local>,
) -> RecoveryResult<BackupReport> {
    let mut sources = vec![paths.ledger()];
    sources.extend(paths.transient_files());
    if let Some(target_file) = target_file {
        sources.push(target_file.to_path_buf());
    }
    let sources: Vec<PathBuf> = sources.into_iter().filter(|p| p.is_file()).collect();
    if sources.is_empty() {
        return Err(RecoveryError::NothingToBackup {
            dir: paths.root().display().to_string(),
        });
    }

    let dir = paths.unique_artifact("backup", "", at);
    std::fs::create_dir_all(&dir).map_err(|e| RecoveryError::io(&dir, e))?;

    let mut files = Vec::with_capacity(sources.len());
    for source in sources {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let dest = dir.join(&name);
        let contents = std::fs::read(&source).map_err(|e| RecoveryError::io(&source, e))?;
        std::fs::copy(&source, &dest).map_err(|e| RecoveryError::io(&dest, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        files.push(ManifestEntry {
            name,
            source,
            size: contents.len() as u64,
            sha256: format!("{:x}", hasher.finalize()),
        });
    }

    let manifest = Manifest {
        created_at: at,
        files,
    };
    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&manifest_path, json).map_err(|e| RecoveryError::io(&manifest_path, e))?;

    log::info!(
        "Backed up {} files to {}",
        manifest.files.len(),
        dir.display()
    );
    Ok(BackupReport {
        dir,
        files: manifest.files,
    })
}
