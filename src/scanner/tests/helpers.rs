//! Fakes shared by the scheduler suites

use crate::health::HealthCheck;
use crate::scanner::tester::{BatchOutcome, BatchRequest, CredentialTester, TesterError};
use crate::targets::TargetList;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// One recorded tester invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub target: String,
    pub credentials: Vec<String>,
    pub at: Instant,
}

/// What the stub does for a given target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Report,
    Fail,
    /// Fire the interrupt token and never finish
    InterruptAndHang,
}

/// Tester that records every call and succeeds for a fixed set of credentials
#[derive(Clone, Default)]
pub struct RecordingTester {
    pub calls: Arc<Mutex<Vec<Call>>>,
    accept: HashSet<String>,
    behaviour: Arc<Mutex<Vec<(String, Behaviour)>>>,
    interrupt: Option<crate::pause::PauseToken>,
    /// Set while the scripted network is down
    network_down: Option<Arc<AtomicBool>>,
    pub calls_while_down: Arc<Mutex<usize>>,
}

impl RecordingTester {
    pub fn accepting(creds: &[&str]) -> Self {
        Self {
            accept: creds.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_behaviour(self, target: &str, behaviour: Behaviour) -> Self {
        self.behaviour
            .lock()
            .unwrap()
            .push((target.to_string(), behaviour));
        self
    }

    pub fn with_interrupt(mut self, token: crate::pause::PauseToken) -> Self {
        self.interrupt = Some(token);
        self
    }

    pub fn watching(mut self, network_down: Arc<AtomicBool>) -> Self {
        self.network_down = Some(network_down);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn targets_called(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for call in self.calls() {
            if seen.last() != Some(&call.target) {
                seen.push(call.target);
            }
        }
        seen
    }

    fn behaviour_for(&self, target: &str) -> Behaviour {
        self.behaviour
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, b)| *b)
            .unwrap_or(Behaviour::Report)
    }
}

#[async_trait]
impl CredentialTester for RecordingTester {
    async fn test_batch(&self, request: &BatchRequest<'_>) -> Result<BatchOutcome, TesterError> {
        if let Some(down) = &self.network_down {
            if down.load(Ordering::SeqCst) {
                *self.calls_while_down.lock().unwrap() += 1;
            }
        }
        self.calls.lock().unwrap().push(Call {
            target: request.target_id.to_string(),
            credentials: request.credentials.to_vec(),
            at: Instant::now(),
        });

        match self.behaviour_for(request.target_id) {
            Behaviour::Fail => Err(TesterError::Exited {
                target: request.target_id.to_string(),
                code: 255,
                transcript: vec!["connection refused".to_string()],
            }),
            Behaviour::InterruptAndHang => {
                if let Some(token) = &self.interrupt {
                    token.trigger();
                }
                std::future::pending::<()>().await;
                unreachable!()
            }
            Behaviour::Report => {
                let successes: Vec<String> = request
                    .credentials
                    .iter()
                    .filter(|c| self.accept.contains(*c))
                    .cloned()
                    .collect();
                let transcript = request
                    .credentials
                    .iter()
                    .map(|c| {
                        let mark = if successes.contains(c) { "[+]" } else { "[-]" };
                        format!("{} {} {}", mark, request.target_id, c)
                    })
                    .collect();
                Ok(BatchOutcome {
                    successes,
                    transcript,
                    exit_code: Some(0),
                })
            }
        }
    }
}

/// Health check answering from a script, then `true` forever
pub struct ScriptedHealth {
    script: Mutex<VecDeque<bool>>,
    pub down: Arc<AtomicBool>,
    pub checks: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedHealth {
    pub fn new(script: &[bool]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            down: Arc::new(AtomicBool::new(false)),
            checks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl HealthCheck for ScriptedHealth {
    async fn check(&self) -> bool {
        self.checks.lock().unwrap().push(Instant::now());
        let healthy = self.script.lock().unwrap().pop_front().unwrap_or(true);
        self.down.store(!healthy, Ordering::SeqCst);
        healthy
    }
}

/// Build a list from `id:creds` lines
pub fn targets(lines: &[&str]) -> TargetList {
    TargetList::parse(&lines.join("\n")).unwrap()
}

/// `n` distinct usernames
pub fn users(n: usize) -> String {
    (1..=n)
        .map(|i| format!("user{:02}", i))
        .collect::<Vec<_>>()
        .join(",")
}
