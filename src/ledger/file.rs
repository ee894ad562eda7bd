//! File-backed ledger: one id per line, append-only during a run

use super::{
    dedup_preserving_order, find_anomalies, Ledger, LedgerAnomaly, LedgerError, LedgerResult,
    ResetConfirmation,
};
use crate::state::StatePaths;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Ledger persisted as a plain text file
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    /// Run markers removed together with the ledger on reset
    transient: Vec<PathBuf>,
    ids: HashSet<String>,
    writer: Option<File>,
}

impl FileLedger {
    /// Open the ledger at `path` and load its contents
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let mut ledger = Self {
            path: path.into(),
            transient: Vec::new(),
            ids: HashSet::new(),
            writer: None,
        };
        ledger.load()?;
        Ok(ledger)
    }

    /// Open the ledger of a state directory, owning its transient markers
    pub fn open_in(paths: &StatePaths) -> LedgerResult<Self> {
        let mut ledger = Self::open(paths.ledger())?;
        ledger.transient = paths.transient_files();
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in file order, duplicates included
    pub fn read_entries(&self) -> LedgerResult<Vec<String>> {
        read_entries(&self.path)
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn append_line(&mut self, id: &str) -> std::io::Result<()> {
        if self.writer.is_none() {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            if !ends_with_newline(&self.path)? {
                writeln!(file)?;
            }
            self.writer = Some(file);
        }
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", id)?;
            writer.sync_data()?;
        }
        Ok(())
    }
}

/// True for a missing or empty file, or one whose last byte is `\n`
fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read ledger lines, trimming whitespace and skipping blanks; missing file is empty
pub fn read_entries(path: &Path) -> LedgerResult<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(LedgerError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

impl Ledger for FileLedger {
    fn load(&mut self) -> LedgerResult<HashSet<String>> {
        let entries = self.read_entries()?;
        self.ids = entries.into_iter().collect();
        log::debug!(
            "Ledger {} holds {} completed targets",
            self.path.display(),
            self.ids.len()
        );
        Ok(self.ids.clone())
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn mark_done(&mut self, id: &str) -> LedgerResult<()> {
        if self.ids.contains(id) {
            log::debug!("Target {} already in ledger, not appending", id);
            return Ok(());
        }
        self.append_line(id).map_err(|e| self.io_error(e))?;
        self.ids.insert(id.to_string());
        Ok(())
    }

    fn completed_count(&self) -> usize {
        self.ids.len()
    }

    fn deduplicate(&mut self) -> LedgerResult<usize> {
        let entries = self.read_entries()?;
        let unique = dedup_preserving_order(&entries);
        let removed = entries.len() - unique.len();
        if removed == 0 {
            return Ok(0);
        }

        // Replaced via rename of a sibling temp file
        self.writer = None;
        let tmp = self.path.with_extension("dedup.tmp");
        let mut body = unique.join("\n");
        body.push('\n');
        let write_tmp = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp, &self.path)
        };
        write_tmp().map_err(|e| self.io_error(e))?;

        self.ids = unique.into_iter().collect();
        log::info!(
            "Removed {} duplicate entries from {}",
            removed,
            self.path.display()
        );
        Ok(removed)
    }

    fn verify(&self) -> LedgerResult<Vec<LedgerAnomaly>> {
        let entries = self.read_entries()?;
        Ok(find_anomalies(entries.iter().map(String::as_str)))
    }

    fn reset(&mut self, _confirmation: ResetConfirmation) -> LedgerResult<()> {
        self.writer = None;
        for path in std::iter::once(&self.path).chain(self.transient.iter()) {
            match std::fs::remove_file(path) {
                Ok(()) => log::info!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(LedgerError::Io {
                        path: path.display().to_string(),
                        source: e,
                    })
                }
            }
        }
        self.ids.clear();
        Ok(())
    }
}
