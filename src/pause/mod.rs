//! Pause Controller
//!
//! Two cooperative triggers, both honoured only between targets:
//!
//! - **interrupt**: a signal flips the [`PauseToken`]; the scheduler abandons
//!   the in-flight batch, leaves a sentinel behind and returns so the process
//!   can print resume instructions and exit.
//! - **sentinel**: while the marker file exists at a target boundary the
//!   scheduler waits, polling, and carries on once it is removed.

pub mod signals;

pub use signals::{install_signal_handlers, PauseToken};

use crate::state::{remove_if_exists, StateResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default sentinel poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of a sentinel check at a safe point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseWait {
    /// No sentinel present
    NotPaused,
    /// Sentinel was present and has been removed
    Resumed { waited: Duration },
    /// An interrupt arrived while paused
    Interrupted,
}

/// Sentinel polling plus the interrupt token
#[derive(Debug, Clone)]
pub struct PauseController {
    sentinel: Option<PathBuf>,
    poll_interval: Duration,
    token: PauseToken,
}

impl PauseController {
    pub fn new(sentinel: impl Into<PathBuf>, poll_interval: Duration, token: PauseToken) -> Self {
        Self {
            sentinel: Some(sentinel.into()),
            poll_interval,
            token,
        }
    }

    /// Controller with no sentinel file; only interrupts apply
    pub fn interrupt_only(token: PauseToken) -> Self {
        Self {
            sentinel: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            token,
        }
    }

    pub fn token(&self) -> &PauseToken {
        &self.token
    }

    pub fn is_interrupted(&self) -> bool {
        self.token.is_requested()
    }

    pub fn sentinel_present(&self) -> bool {
        self.sentinel.as_ref().is_some_and(|p| p.exists())
    }

    /// Block while the sentinel exists
    pub async fn wait_while_paused(&self) -> PauseWait {
        if !self.sentinel_present() {
            return PauseWait::NotPaused;
        }
        let started = tokio::time::Instant::now();
        log::info!("Pause marker present; waiting for it to be removed");
        while self.sentinel_present() {
            tokio::select! {
                _ = self.token.cancelled() => return PauseWait::Interrupted,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        let waited = started.elapsed();
        log::info!("Pause marker removed after {:?}; continuing", waited);
        PauseWait::Resumed { waited }
    }

    /// Leave a zero-byte marker so the stop is visible to `status`
    pub fn create_sentinel(&self) -> StateResult<()> {
        if let Some(path) = &self.sentinel {
            std::fs::write(path, b"").map_err(|e| crate::state::StateError::io(path, e))?;
        }
        Ok(())
    }

    /// Remove a marker left by an earlier interrupt; true if one was removed
    pub fn clear_sentinel(&self) -> StateResult<bool> {
        match &self.sentinel {
            Some(path) if path.exists() => {
                remove_if_exists(path)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(dir: &tempfile::TempDir) -> PauseController {
        PauseController::new(
            dir.path().join(".pause_scan"),
            Duration::from_secs(5),
            PauseToken::new(),
        )
    }

    #[tokio::test]
    async fn test_no_sentinel_is_not_paused() {
        let dir = tempfile::tempdir().unwrap();
        let pause = controller(&dir);
        assert!(!pause.sentinel_present());
        assert_eq!(pause.wait_while_paused().await, PauseWait::NotPaused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_sentinel_removed() {
        let dir = tempfile::tempdir().unwrap();
        let pause = controller(&dir);
        pause.create_sentinel().unwrap();

        let sentinel = dir.path().join(".pause_scan");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            std::fs::remove_file(sentinel).unwrap();
        });

        match pause.wait_while_paused().await {
            PauseWait::Resumed { waited } => {
                assert!(waited >= Duration::from_secs(12));
                assert!(waited <= Duration::from_secs(16));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_while_paused() {
        let dir = tempfile::tempdir().unwrap();
        let pause = controller(&dir);
        pause.create_sentinel().unwrap();
        let token = pause.token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            token.trigger();
        });

        assert_eq!(pause.wait_while_paused().await, PauseWait::Interrupted);
        assert!(pause.is_interrupted());
    }

    #[test]
    fn test_clear_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let pause = controller(&dir);
        assert!(!pause.clear_sentinel().unwrap());
        pause.create_sentinel().unwrap();
        assert!(pause.clear_sentinel().unwrap());
        assert!(!pause.sentinel_present());
    }

    #[test]
    fn test_interrupt_only_has_no_sentinel() {
        let pause = PauseController::interrupt_only(PauseToken::new());
        pause.create_sentinel().unwrap();
        assert!(!pause.sentinel_present());
    }
}
