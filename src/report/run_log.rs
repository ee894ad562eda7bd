//! Append-only run transcript (`scan_<stamp>.log`)

use super::{ReportError, ReportResult};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Human-readable transcript of one run; tester output is copied in verbatim
#[derive(Debug, Default)]
pub struct RunLog {
    file: Option<(PathBuf, File)>,
}

impl RunLog {
    /// Create (or append to) the transcript at `path`
    pub fn create(path: impl Into<PathBuf>) -> ReportResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ReportError::io(&path, e))?;
        Ok(Self {
            file: Some((path, file)),
        })
    }

    /// Transcript that discards everything
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(p, _)| p.as_path())
    }

    /// Write one timestamped line. Failures are logged, never fatal.
    pub fn line(&mut self, message: &str) {
        if let Some((path, file)) = self.file.as_mut() {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            if let Err(e) = writeln!(file, "[{}] {}", stamp, message) {
                log::warn!("Could not write run log {}: {}", path.display(), e);
            }
        }
    }

    /// Copy raw tester output, indented under the current entry
    pub fn output(&mut self, lines: &[String]) {
        if let Some((path, file)) = self.file.as_mut() {
            for line in lines {
                if let Err(e) = writeln!(file, "    {}", line) {
                    log::warn!("Could not write run log {}: {}", path.display(), e);
                    return;
                }
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some((_, file)) = self.file.as_mut() {
            let _ = file.flush();
        }
    }
}
