//! Interrupt token and signal wiring
//!
//! Signals never touch scan state directly. The handlers only flip a
//! [`PauseToken`]; the scheduler reads it at its safe points and awaits
//! [`PauseToken::cancelled`] around the in-flight tester invocation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Cancellation token shared between the signal handlers and the scheduler
#[derive(Debug, Clone)]
pub struct PauseToken {
    tx: broadcast::Sender<()>,
    requested: Arc<AtomicBool>,
}

impl Default for PauseToken {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseToken {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(8);
        Self {
            tx,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request a pause; idempotent
    pub fn trigger(&self) {
        // Release pairs with the Acquire in is_requested()
        self.requested.store(true, Ordering::Release);
        let _ = self.tx.send(());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Resolves once a pause has been requested
    pub async fn cancelled(&self) {
        // Subscribe before checking the flag so a trigger in between is not lost
        let mut rx = self.tx.subscribe();
        if self.is_requested() {
            return;
        }
        let _ = rx.recv().await;
    }
}

/// Route SIGINT/SIGTERM/SIGHUP to `token`; a second signal exits with 130
///
/// Must be called from within a tokio runtime.
pub fn install_signal_handlers(token: &PauseToken) {
    let signal_count = Arc::new(AtomicUsize::new(0));

    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use tokio::signal::unix::{signal, SignalKind};
        let signals = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
        ];

        for kind in signals {
            let token = token.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                let Ok(mut sig) = signal(kind) else {
                    log::warn!("Could not install handler for {:?}", kind);
                    return;
                };
                while sig.recv().await.is_some() {
                    on_signal(&token, &sig_ctr);
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        let token = token.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                on_signal(&token, &signal_count);
            }
        });
    }
}

fn on_signal(token: &PauseToken, counter: &AtomicUsize) {
    let prev = counter.fetch_add(1, Ordering::AcqRel);
    if prev >= 1 {
        log::warn!("Second interrupt received; exiting immediately");
        std::process::exit(130);
    }
    log::warn!("Interrupt received; stopping at the next safe point");
    token.trigger();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_token_starts_clear() {
        let token = PauseToken::new();
        assert!(!token.is_requested());
        assert!(timeout(Duration::from_millis(20), token.cancelled())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_trigger_wakes_waiters() {
        let token = PauseToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;

        token.trigger();
        assert!(token.is_requested());
        assert!(timeout(Duration::from_millis(100), waiter).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_after_trigger_returns_immediately() {
        let token = PauseToken::new();
        token.trigger();
        token.trigger();
        assert!(timeout(Duration::from_millis(20), token.cancelled())
            .await
            .is_ok());
    }

    #[test]
    fn test_first_signal_triggers_token() {
        let token = PauseToken::new();
        let counter = AtomicUsize::new(0);
        on_signal(&token, &counter);
        assert!(token.is_requested());
        assert_eq!(counter.load(Ordering::Acquire), 1);
    }
}
