//! Target List
//!
//! Loads the normalized target file (`id:cred1,cred2,...`, one target per line)
//! into an immutable, order-preserving list. Duplicate ids are rejected with
//! [`TargetError::DuplicateTarget`].

use std::collections::HashMap;
use std::path::Path;

/// A single host under test with its ordered candidate credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    pub id: String,
    pub credentials: Vec<String>,
}

/// Target list errors
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("target file not found: {path}")]
    NotFound { path: String },

    #[error("failed to read target file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected 'id:credential1,credential2,...', got '{content}'")]
    MalformedRecord { line: usize, content: String },

    #[error("line {line}: target '{id}' has no credentials")]
    EmptyCredentials { line: usize, id: String },

    #[error("line {line}: duplicate target '{id}' (first seen on line {first_line})")]
    DuplicateTarget {
        line: usize,
        first_line: usize,
        id: String,
    },

    #[error("target file {path} contains no targets")]
    Empty { path: String },
}

impl crate::core::error_handling::ContextualError for TargetError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, TargetError::Io { .. })
    }
}

pub type TargetResult<T> = Result<T, TargetError>;

/// Immutable ordered sequence of targets for one run
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    records: Vec<TargetRecord>,
}

impl TargetList {
    /// Load and validate a target file
    pub fn load(path: &Path) -> TargetResult<Self> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TargetError::NotFound {
                    path: display.clone(),
                }
            } else {
                TargetError::Io {
                    path: display.clone(),
                    source: e,
                }
            }
        })?;

        let list = Self::parse(&contents)?;
        if list.is_empty() {
            return Err(TargetError::Empty { path: display });
        }
        log::info!("Loaded {} targets from {}", list.len(), display);
        Ok(list)
    }

    /// Parse target file contents; blank lines and `#` comments are skipped
    pub fn parse(contents: &str) -> TargetResult<Self> {
        let mut records = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (idx, raw) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record = parse_record(line, line_no)?;
            if let Some(first_line) = seen.get(&record.id) {
                return Err(TargetError::DuplicateTarget {
                    line: line_no,
                    first_line: *first_line,
                    id: record.id,
                });
            }
            seen.insert(record.id.clone(), line_no);
            records.push(record);
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetRecord> {
        self.records.iter()
    }

    /// Target ids in list order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    /// Total number of credentials across all targets
    pub fn credential_count(&self) -> usize {
        self.records.iter().map(|r| r.credentials.len()).sum()
    }
}

impl<'a> IntoIterator for &'a TargetList {
    type Item = &'a TargetRecord;
    type IntoIter = std::slice::Iter<'a, TargetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn parse_record(line: &str, line_no: usize) -> TargetResult<TargetRecord> {
    // Split on the last ':' so IPv6 ids keep their colons
    let malformed = || TargetError::MalformedRecord {
        line: line_no,
        content: line.to_string(),
    };
    let (id, csv) = line.rsplit_once(':').ok_or_else(malformed)?;
    let id = id.trim();
    if id.is_empty() || id.contains(char::is_whitespace) {
        return Err(malformed());
    }

    let mut credentials: Vec<String> = Vec::new();
    for cred in csv.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !credentials.iter().any(|c| c == cred) {
            credentials.push(cred.to_string());
        }
    }
    if credentials.is_empty() {
        return Err(TargetError::EmptyCredentials {
            line: line_no,
            id: id.to_string(),
        });
    }

    Ok(TargetRecord {
        id: id.to_string(),
        credentials,
    })
}
