//! Target ingestion
//!
//! Turns a vulnerability-scanner CSV export (an `IP` column plus a `Results`
//! column holding one account name per line) into the normalized
//! `id:user1,user2` target file the engine consumes.

pub mod csv;

use crate::core::error_handling::ContextualError;
use crate::core::validation::is_valid_username;
use crate::targets::TargetRecord;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;

pub const IP_COLUMN: &str = "IP";
pub const RESULTS_COLUMN: &str = "Results";

/// Words that appear in Results cells as headings rather than accounts
const HEADER_WORDS: [&str; 4] = ["username", "results", "user", "name"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("CSV file not found: {path}")]
    NotFound { path: String },

    #[error("CSV must have 'IP' and 'Results' columns; found: {}", .found.join(", "))]
    MissingColumns { found: Vec<String> },

    #[error("CSV file {path} is empty")]
    Empty { path: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ContextualError for IngestError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, IngestError::Io { .. })
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Counts reported after a conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    pub skipped_rows: usize,
    pub targets: usize,
    pub accounts: usize,
}

/// Convert CSV text into sorted target records
pub fn convert(text: &str) -> IngestResult<(Vec<TargetRecord>, IngestSummary)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = csv::parse_records(text).into_iter();
    let header = records.next().ok_or(IngestError::Empty {
        path: "<input>".to_string(),
    })?;
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
    let column = |name: &str| header.iter().position(|h| h == name);
    let (Some(ip_col), Some(results_col)) = (column(IP_COLUMN), column(RESULTS_COLUMN)) else {
        return Err(IngestError::MissingColumns { found: header });
    };

    let mut summary = IngestSummary::default();
    let mut order: Vec<String> = Vec::new();
    let mut accounts: HashMap<String, Vec<String>> = HashMap::new();

    for (idx, row) in records.enumerate() {
        let row_no = idx + 1;
        summary.rows += 1;
        let ip = row.get(ip_col).map(|s| s.trim()).unwrap_or_default();
        let results = row.get(results_col).map(String::as_str).unwrap_or_default();

        if ip.is_empty() {
            log::warn!("Row {} has no IP address", row_no);
            summary.skipped_rows += 1;
            continue;
        }
        if results.trim().is_empty() {
            log::warn!("Row {} ({}) has no results", row_no, ip);
            summary.skipped_rows += 1;
            continue;
        }

        let users = extract_usernames(results);
        if users.is_empty() {
            log::warn!("No valid usernames found for {}", ip);
            summary.skipped_rows += 1;
            continue;
        }

        let entry = accounts.entry(ip.to_string()).or_insert_with(|| {
            order.push(ip.to_string());
            Vec::new()
        });
        for user in users {
            if !entry.contains(&user) {
                entry.push(user);
            }
        }
    }

    order.sort_by(|a, b| compare_ids(a, b));
    let targets: Vec<TargetRecord> = order
        .into_iter()
        .filter_map(|id| {
            accounts.remove(&id).map(|credentials| TargetRecord { id, credentials })
        })
        .collect();

    summary.targets = targets.len();
    summary.accounts = targets.iter().map(|t| t.credentials.len()).sum();
    Ok((targets, summary))
}

/// Account names from one Results cell, in order of appearance
pub fn extract_usernames(cell: &str) -> Vec<String> {
    let normalized = cell
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut users: Vec<String> = Vec::new();
    for candidate in normalized.split('\n').map(str::trim) {
        if candidate.is_empty()
            || HEADER_WORDS
                .iter()
                .any(|w| candidate.eq_ignore_ascii_case(w))
        {
            continue;
        }
        if is_valid_username(candidate) && !users.iter().any(|u| u == candidate) {
            users.push(candidate.to_string());
        }
    }
    users
}

/// IP addresses in numeric order, then hostnames lexically
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// `id:user1,user2` lines
pub fn render_targets(targets: &[TargetRecord]) -> String {
    let mut out = String::new();
    for target in targets {
        out.push_str(&target.id);
        out.push(':');
        out.push_str(&target.credentials.join(","));
        out.push('\n');
    }
    out
}

/// Read `input`, write the target file to `output`
pub fn ingest_file<W: Write>(input: &Path, output: &mut W) -> IngestResult<IngestSummary> {
    let display = input.display().to_string();
    let bytes = std::fs::read(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IngestError::NotFound {
            path: display.clone(),
        },
        _ => IngestError::Io {
            path: display.clone(),
            source: e,
        },
    })?;
    let text = String::from_utf8_lossy(&bytes);
    if text.trim().is_empty() {
        return Err(IngestError::Empty { path: display });
    }

    let (targets, summary) = convert(&text)?;
    output
        .write_all(render_targets(&targets).as_bytes())
        .and_then(|_| output.flush())
        .map_err(|source| IngestError::Io {
            path: "<output>".to_string(),
            source,
        })?;

    log::info!(
        "Processed {} rows, wrote {} targets with {} accounts",
        summary.rows,
        summary.targets,
        summary.accounts
    );
    Ok(summary)
}
