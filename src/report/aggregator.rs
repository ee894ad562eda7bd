use super::{ReportError, ReportResult, RunLog};
use crate::core::styles::StyleRole;
use crate::scanner::types::BatchResult;
use crate::state::StatePaths;
use chrono::{DateTime, Local};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// One working `target:credential` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessPair {
    pub target_id: String,
    pub credential: String,
}

impl fmt::Display for SuccessPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_id, self.credential)
    }
}

/// Totals for one invocation of the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub targets_total: usize,
    pub targets_attempted: usize,
    /// Already in the ledger when reached
    pub targets_skipped: usize,
    pub credentials_attempted: usize,
    pub failed_batches: usize,
    pub successes: Vec<SuccessPair>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Targets neither attempted nor skipped in this run
    pub fn not_reached(&self) -> usize {
        self.targets_total
            .saturating_sub(self.targets_attempted + self.targets_skipped)
    }
}

/// Folds batch results into a summary and mirrors progress to the transcript
#[derive(Debug)]
pub struct Aggregator {
    summary: RunSummary,
    run_log: RunLog,
    console: bool,
    color: bool,
    started: Instant,
}

impl Aggregator {
    pub fn new(run_log: RunLog) -> Self {
        Self {
            summary: RunSummary::default(),
            run_log,
            console: false,
            color: false,
            started: Instant::now(),
        }
    }

    /// Print per-target lines to stdout
    pub fn with_console(mut self, color: bool) -> Self {
        self.console = true;
        self.color = color;
        self
    }

    pub fn begin(&mut self, targets_total: usize, already_done: usize) {
        self.summary.targets_total = targets_total;
        self.started = Instant::now();
        self.run_log.line(&format!(
            "Scan started: {} targets, {} already completed",
            targets_total, already_done
        ));
    }

    pub fn record_skipped(&mut self, target_id: &str) {
        self.summary.targets_skipped += 1;
        log::trace!("Skipping completed target {}", target_id);
    }

    pub fn record_batch_output(&mut self, target_id: &str, batch_no: usize, lines: &[String]) {
        self.run_log
            .line(&format!("{} batch {} output:", target_id, batch_no));
        self.run_log.output(lines);
    }

    pub fn record_batch_failure(&mut self, target_id: &str, batch_no: usize, reason: &str) {
        self.summary.failed_batches += 1;
        self.run_log.line(&format!(
            "{} batch {} FAILED: {}",
            target_id, batch_no, reason
        ));
    }

    pub fn record_target(&mut self, result: &BatchResult) {
        self.summary.targets_attempted += 1;
        self.summary.credentials_attempted += result.attempted_count;
        for credential in &result.successful_credentials {
            self.summary.successes.push(SuccessPair {
                target_id: result.target_id.clone(),
                credential: credential.clone(),
            });
        }

        self.run_log.line(&format_target_line(result, false));
        if self.console {
            println!("{}", format_target_line(result, self.color));
        }
    }

    /// Free-form transcript entry
    pub fn note(&mut self, message: &str) {
        self.run_log.line(message);
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Close out the run and return the totals
    pub fn finish(&mut self, status: &str) -> RunSummary {
        self.summary.elapsed = self.started.elapsed();
        let rendered = render_summary(&self.summary, status, false);
        for line in rendered.lines() {
            self.run_log.line(line);
        }
        self.run_log.flush();
        self.summary.clone()
    }
}

/// `10.0.0.1  attempted 3  succeeded 1  [alice]`
pub fn format_target_line(result: &BatchResult, color: bool) -> String {
    let succeeded = if result.success_count > 0 {
        StyleRole::Success.paint(&format!("succeeded {}", result.success_count), color)
    } else {
        StyleRole::Dim.paint("succeeded 0", color)
    };
    let mut line = format!(
        "{}  attempted {}  {}",
        StyleRole::Target.paint(&result.target_id, color),
        result.attempted_count,
        succeeded
    );
    if !result.successful_credentials.is_empty() {
        let creds: Vec<&str> = result
            .successful_credentials
            .iter()
            .map(String::as_str)
            .collect();
        line.push_str(&format!(
            "  [{}]",
            StyleRole::Success.paint(&creds.join(", "), color)
        ));
    }
    line
}

/// Multi-line end-of-run summary
pub fn render_summary(summary: &RunSummary, status: &str, color: bool) -> String {
    let key = |k: &str| StyleRole::Key.paint(k, color);
    let mut out = String::new();
    out.push_str(&StyleRole::Header.paint(&format!("Scan {}", status), color));
    out.push('\n');
    out.push_str(&format!(
        "  {} {}\n",
        key("Targets total:      "),
        summary.targets_total
    ));
    out.push_str(&format!(
        "  {} {}\n",
        key("Attempted this run: "),
        summary.targets_attempted
    ));
    out.push_str(&format!(
        "  {} {}\n",
        key("Skipped (done):     "),
        summary.targets_skipped
    ));
    out.push_str(&format!(
        "  {} {}\n",
        key("Credentials tried:  "),
        summary.credentials_attempted
    ));
    if summary.failed_batches > 0 {
        out.push_str(&format!(
            "  {} {}\n",
            key("Failed batches:     "),
            StyleRole::Failure.paint(&summary.failed_batches.to_string(), color)
        ));
    }
    let successes = summary.success_count().to_string();
    let successes = if summary.success_count() > 0 {
        StyleRole::Success.paint(&successes, color)
    } else {
        successes
    };
    out.push_str(&format!("  {} {}\n", key("Successes:          "), successes));
    out.push_str(&format!(
        "  {} {}s",
        key("Elapsed:            "),
        summary.elapsed.as_secs()
    ));
    out
}

/// Write `successes_<stamp>.txt` if anything succeeded; never overwrites
pub fn write_success_report(
    summary: &RunSummary,
    paths: &StatePaths,
    at: DateTime<Local>,
) -> ReportResult<Option<PathBuf>> {
    if summary.successes.is_empty() {
        return Ok(None);
    }

    let path = paths.unique_artifact("successes", "txt", at);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| ReportError::io(&path, e))?;
    let mut body = String::new();
    for pair in &summary.successes {
        body.push_str(&pair.to_string());
        body.push('\n');
    }
    file.write_all(body.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| ReportError::io(&path, e))?;

    log::info!(
        "Wrote {} successful credentials to {}",
        summary.successes.len(),
        path.display()
    );
    Ok(Some(path))
}
