//! External credential tester
//!
//! The engine never speaks the remote protocol itself. Each batch is handed to
//! a [`CredentialTester`], which returns the credentials that worked plus the
//! raw output for the run log. [`CommandTester`] runs a configured external
//! program once per batch.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// File holding the current batch, one credential per line
pub const BATCH_USERS_FILE: &str = ".batch_users";

/// Added to the per-attempt budget to cover tool start-up
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Default marker for a success line in tester output
pub const DEFAULT_SUCCESS_PATTERN: &str = r"\[\+\]";

/// One tester invocation: a single target and a bounded credential batch
#[derive(Debug, Clone)]
pub struct BatchRequest<'a> {
    pub target_id: &'a str,
    pub credentials: &'a [String],
    pub secret: &'a str,
    pub attempt_timeout: Duration,
}

/// Structured result of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Credentials from the batch that were accepted
    pub successes: Vec<String>,
    /// Raw output lines, for the run log only
    pub transcript: Vec<String>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum TesterError {
    #[error("tester command is empty")]
    EmptyCommand,

    #[error("tester program '{program}' not found on PATH")]
    MissingProgram { program: String },

    #[error("invalid success pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tester for {target} did not finish within {after:?}")]
    TimedOut { target: String, after: Duration },

    #[error("tester for {target} exited with status {code}")]
    Exited {
        target: String,
        code: i32,
        transcript: Vec<String>,
    },

    #[error("tester I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl crate::core::error_handling::ContextualError for TesterError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            TesterError::EmptyCommand
                | TesterError::MissingProgram { .. }
                | TesterError::InvalidPattern { .. }
        )
    }
}

/// Seam between the scheduler and whatever actually tests credentials
#[async_trait]
pub trait CredentialTester: Send + Sync {
    async fn test_batch(&self, request: &BatchRequest<'_>) -> Result<BatchOutcome, TesterError>;
}

/// Runs an argv template once per batch
///
/// Placeholders: `{target}`, `{users}` (comma-joined), `{users_file}`,
/// `{secret}`, `{timeout}` (per-attempt seconds) and `{threads}`.
#[derive(Debug, Clone)]
pub struct CommandTester {
    argv: Vec<String>,
    success: Regex,
    threads: usize,
    users_file: PathBuf,
    grace: Duration,
}

impl CommandTester {
    pub fn new(
        argv: Vec<String>,
        success_pattern: &str,
        threads: usize,
        work_dir: &Path,
    ) -> Result<Self, TesterError> {
        if argv.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(TesterError::EmptyCommand);
        }
        let success = Regex::new(success_pattern).map_err(|source| TesterError::InvalidPattern {
            pattern: success_pattern.to_string(),
            source,
        })?;
        Ok(Self {
            argv,
            success,
            threads: threads.max(1),
            users_file: work_dir.join(BATCH_USERS_FILE),
            grace: DEFAULT_GRACE,
        })
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Resolve the program now so a missing tool fails before scheduling
    pub fn check_available(&self) -> Result<PathBuf, TesterError> {
        resolve_program(self.program()).ok_or_else(|| TesterError::MissingProgram {
            program: self.program().to_string(),
        })
    }

    /// Whole-invocation deadline for a batch
    pub fn deadline(&self, request: &BatchRequest<'_>) -> Duration {
        request.attempt_timeout * request.credentials.len() as u32 + self.grace
    }

    fn uses_users_file(&self) -> bool {
        self.argv.iter().any(|a| a.contains("{users_file}"))
    }

    /// Substitute placeholders into every argument
    pub fn render(&self, request: &BatchRequest<'_>) -> Vec<String> {
        let users = request.credentials.join(",");
        let users_file = self.users_file.display().to_string();
        let timeout = request.attempt_timeout.as_secs().to_string();
        let threads = self.threads.to_string();

        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{target}", request.target_id)
                    .replace("{users_file}", &users_file)
                    .replace("{users}", &users)
                    .replace("{secret}", request.secret)
                    .replace("{timeout}", &timeout)
                    .replace("{threads}", &threads)
            })
            .collect()
    }

    async fn write_users_file(&self, credentials: &[String]) -> Result<(), TesterError> {
        let mut body = credentials.join("\n");
        body.push('\n');
        tokio::fs::write(&self.users_file, body)
            .await
            .map_err(|source| TesterError::Io {
                path: self.users_file.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl CredentialTester for CommandTester {
    async fn test_batch(&self, request: &BatchRequest<'_>) -> Result<BatchOutcome, TesterError> {
        if self.uses_users_file() {
            self.write_users_file(request.credentials).await?;
        }

        let argv = self.render(request);
        let deadline = self.deadline(request);
        log::debug!(
            "Running {} against {} with {} credentials (deadline {:?})",
            self.program(),
            request.target_id,
            request.credentials.len(),
            deadline
        );

        let mut cmd = tokio::process::Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| TesterError::Spawn {
            program: self.program().to_string(),
            source,
        })?;

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| TesterError::Io {
                path: self.program().to_string(),
                source,
            })?,
            Err(_) => {
                return Err(TesterError::TimedOut {
                    target: request.target_id.to_string(),
                    after: deadline,
                })
            }
        };

        let mut transcript: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        transcript.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::to_string),
        );

        let successes = parse_successes(&transcript, &self.success, request.credentials);
        let exit_code = output.status.code();

        if !output.status.success() && successes.is_empty() {
            return Err(TesterError::Exited {
                target: request.target_id.to_string(),
                code: exit_code.unwrap_or(-1),
                transcript,
            });
        }
        if !output.status.success() {
            log::warn!(
                "Tester exited with {:?} for {} but reported successes",
                exit_code,
                request.target_id
            );
        }

        Ok(BatchOutcome {
            successes,
            transcript,
            exit_code,
        })
    }
}

static TOKEN_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.$-]+").expect("token split regex is valid"));

/// Credentials from `batch` that appear as a whole token on a success line
///
/// Returned in batch order, each at most once.
pub fn parse_successes(lines: &[String], success: &Regex, batch: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    for line in lines.iter().filter(|l| success.is_match(l)) {
        for token in TOKEN_SPLIT.split(line) {
            if let Some(cred) = batch.iter().find(|c| c.as_str() == token) {
                if !found.contains(cred) {
                    found.push(cred.clone());
                }
            }
        }
    }
    found.sort_by_key(|c| batch.iter().position(|b| b == c));
    found
}

/// Locate an executable `program` the way a shell would
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
