//! Scanner Types and Enums
//!
//! Shared types used by the scheduler, the tester seam and the aggregator.

use std::collections::BTreeSet;
use std::time::Duration;

/// Scheduler tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Maximum credentials per tester invocation
    pub batch_size: usize,
    /// Pause between batches of the same target
    pub batch_delay: Duration,
    /// Per-attempt timeout handed to the tester
    pub attempt_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(6),
        }
    }
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ScanState {
    Idle,
    Running,
    /// Waiting for the network to come back
    #[strum(to_string = "Blocked(VPN)")]
    Blocked,
    /// Waiting for the pause sentinel to be removed
    #[strum(to_string = "Paused(Manual)")]
    Paused,
    Complete,
    Interrupted,
}

/// Per-target outcome, folded into the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub target_id: String,
    pub attempted_count: usize,
    pub success_count: usize,
    pub successful_credentials: BTreeSet<String>,
}

impl BatchResult {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            ..Self::default()
        }
    }

    /// Fold in one batch: `attempted` credentials, `successes` among them
    pub fn absorb<I>(&mut self, attempted: usize, successes: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.attempted_count += attempted;
        self.successful_credentials.extend(successes);
        self.success_count = self.successful_credentials.len();
    }
}

/// How a scheduler run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every target is in the ledger
    Complete,
    /// Stopped by an interrupt; `at_target` was in progress and is not done
    Interrupted { at_target: Option<String> },
}

impl ScanOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Complete => "complete",
            ScanOutcome::Interrupted { .. } => "paused",
        }
    }
}

/// Everything the caller needs after a run
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub summary: crate::report::RunSummary,
    /// Tester invocations made in this run
    pub invocations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ScanState::Running.to_string(), "Running");
        assert_eq!(ScanState::Blocked.to_string(), "Blocked(VPN)");
        assert_eq!(ScanState::Paused.to_string(), "Paused(Manual)");
    }

    #[test]
    fn test_absorb_merges_batches() {
        let mut result = BatchResult::new("10.0.0.1");
        result.absorb(5, vec!["alice".to_string()]);
        result.absorb(2, Vec::new());
        result.absorb(3, vec!["bob".to_string(), "alice".to_string()]);
        assert_eq!(result.attempted_count, 10);
        assert_eq!(result.success_count, 2);
        assert!(result.successful_credentials.contains("bob"));
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.batch_delay, Duration::from_secs(2));
        assert_eq!(config.attempt_timeout, Duration::from_secs(6));
    }
}
