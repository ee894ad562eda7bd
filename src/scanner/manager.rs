//! Batch Scheduler
//!
//! Walks the target list in order, skipping anything already in the ledger.
//! Each remaining target has its credentials split into bounded batches that
//! are handed to the tester strictly one after another, with a delay between
//! batches of the same target. A target is marked done only after its last
//! batch has been attempted.
//!
//! Safe points are target boundaries: the pause sentinel and the health gate
//! are consulted there. An interrupt is also honoured mid-target by dropping
//! the in-flight invocation; that target is not marked done.

use super::batch::partition;
use super::error::ScanResult;
use super::tester::{BatchRequest, CredentialTester, TesterError};
use super::types::{BatchResult, ScanConfig, ScanOutcome, ScanReport, ScanState};
use crate::health::{HealthGate, RecoveryWait};
use crate::ledger::Ledger;
use crate::pause::{PauseController, PauseToken, PauseWait};
use crate::report::{Aggregator, RunLog};
use crate::state::{clear_position, write_position, StatePaths};
use crate::targets::{TargetList, TargetRecord};
use tokio::sync::watch;

pub struct Scheduler<L: Ledger, T: CredentialTester> {
    config: ScanConfig,
    ledger: L,
    tester: T,
    secret: String,
    health: HealthGate,
    pause: PauseController,
    paths: Option<StatePaths>,
    aggregator: Aggregator,
    state: ScanState,
    state_tx: Option<watch::Sender<ScanState>>,
    invocations: usize,
}

impl<L: Ledger, T: CredentialTester> Scheduler<L, T> {
    pub fn new(config: ScanConfig, ledger: L, tester: T, secret: impl Into<String>) -> Self {
        Self {
            config,
            ledger,
            tester,
            secret: secret.into(),
            health: HealthGate::disabled(),
            pause: PauseController::interrupt_only(PauseToken::new()),
            paths: None,
            aggregator: Aggregator::new(RunLog::disabled()),
            state: ScanState::Idle,
            state_tx: None,
            invocations: 0,
        }
    }

    pub fn with_health(mut self, health: HealthGate) -> Self {
        self.health = health;
        self
    }

    pub fn with_pause(mut self, pause: PauseController) -> Self {
        self.pause = pause;
        self
    }

    /// Enables the position hint
    pub fn with_state_paths(mut self, paths: StatePaths) -> Self {
        self.paths = Some(paths);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Publish state transitions, e.g. to a waiting indicator
    pub fn with_state_watch(mut self, tx: watch::Sender<ScanState>) -> Self {
        self.state_tx = Some(tx);
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Tester invocations started so far
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    fn set_state(&mut self, next: ScanState) {
        if self.state != next {
            log::debug!("Scheduler state: {} -> {}", self.state, next);
            self.state = next;
            if let Some(tx) = &self.state_tx {
                let _ = tx.send(next);
            }
        }
    }

    fn note_position(&self, target_id: &str) -> ScanResult<()> {
        if let Some(paths) = &self.paths {
            write_position(paths, target_id)?;
        }
        Ok(())
    }

    /// Process every target not yet in the ledger
    pub async fn run(&mut self, targets: &TargetList) -> ScanResult<ScanReport> {
        self.ledger.load()?;
        let already_done = targets.ids().filter(|id| self.ledger.contains(id)).count();
        log::info!(
            "Scanning {} targets ({} already completed, {} remaining)",
            targets.len(),
            already_done,
            targets.len() - already_done
        );
        self.aggregator.begin(targets.len(), already_done);
        self.set_state(ScanState::Running);

        for record in targets {
            if self.ledger.contains(&record.id) {
                self.aggregator.record_skipped(&record.id);
                continue;
            }
            if self.pause.is_interrupted() {
                return self.stop_interrupted(Some(&record.id));
            }

            if self.pause.sentinel_present() {
                self.set_state(ScanState::Paused);
                self.note_position(&record.id)?;
                self.aggregator
                    .note(&format!("Paused by marker before {}", record.id));
                if self.pause.wait_while_paused().await == PauseWait::Interrupted {
                    return self.stop_interrupted(Some(&record.id));
                }
                self.aggregator.note("Pause marker removed, continuing");
                self.set_state(ScanState::Running);
            }

            if self.health.is_due() && !self.health.check_now().await {
                self.set_state(ScanState::Blocked);
                self.note_position(&record.id)?;
                log::warn!(
                    "Network check failed before {}; waiting for it to recover",
                    record.id
                );
                self.aggregator
                    .note(&format!("Network down, blocked before {}", record.id));
                match self.health.wait_for_recovery(self.pause.token()).await {
                    RecoveryWait::Interrupted => return self.stop_interrupted(Some(&record.id)),
                    RecoveryWait::Recovered { polls } => {
                        self.aggregator
                            .note(&format!("Network restored after {} failed polls", polls));
                    }
                }
                self.set_state(ScanState::Running);
            }

            let Some(result) = self.scan_target(record).await else {
                return self.stop_interrupted(Some(&record.id));
            };
            self.ledger.mark_done(&record.id)?;
            self.aggregator.record_target(&result);
        }

        if let Some(paths) = &self.paths {
            clear_position(paths)?;
        }
        self.set_state(ScanState::Complete);
        log::info!("Scan complete");
        Ok(ScanReport {
            outcome: ScanOutcome::Complete,
            summary: self.aggregator.finish(ScanOutcome::Complete.label()),
            invocations: self.invocations,
        })
    }

    /// All batches for one target; `None` if interrupted part way
    async fn scan_target(&mut self, record: &TargetRecord) -> Option<BatchResult> {
        let batches = partition(&record.credentials, self.config.batch_size);
        let mut result = BatchResult::new(&record.id);
        log::info!(
            "Testing {} ({} credentials in {} batches)",
            record.id,
            record.credentials.len(),
            batches.len()
        );

        for (idx, batch) in batches.iter().enumerate() {
            let batch_no = idx + 1;
            if idx > 0 {
                tokio::select! {
                    biased;
                    _ = self.pause.token().cancelled() => return None,
                    _ = tokio::time::sleep(self.config.batch_delay) => {}
                }
            }

            let request = BatchRequest {
                target_id: &record.id,
                credentials: batch,
                secret: &self.secret,
                attempt_timeout: self.config.attempt_timeout,
            };
            self.invocations += 1;
            let outcome = tokio::select! {
                biased;
                _ = self.pause.token().cancelled() => return None,
                outcome = self.tester.test_batch(&request) => outcome,
            };

            match outcome {
                Ok(outcome) => {
                    self.aggregator
                        .record_batch_output(&record.id, batch_no, &outcome.transcript);
                    result.absorb(batch.len(), outcome.successes);
                }
                Err(e) => {
                    log::warn!("Batch {} for {} failed: {}", batch_no, record.id, e);
                    if let TesterError::Exited { transcript, .. } = &e {
                        self.aggregator
                            .record_batch_output(&record.id, batch_no, transcript);
                    }
                    self.aggregator
                        .record_batch_failure(&record.id, batch_no, &e.to_string());
                    result.absorb(batch.len(), Vec::new());
                }
            }
        }
        Some(result)
    }

    fn stop_interrupted(&mut self, at_target: Option<&str>) -> ScanResult<ScanReport> {
        self.set_state(ScanState::Interrupted);
        if let Some(id) = at_target {
            self.note_position(id)?;
        }
        self.pause.create_sentinel()?;
        log::warn!(
            "Scan interrupted{}",
            at_target
                .map(|id| format!(" at {}", id))
                .unwrap_or_default()
        );

        let outcome = ScanOutcome::Interrupted {
            at_target: at_target.map(str::to_string),
        };
        Ok(ScanReport {
            summary: self.aggregator.finish(outcome.label()),
            outcome,
            invocations: self.invocations,
        })
    }
}
