//! Health Monitor
//!
//! Decides whether the outbound path (normally a VPN tunnel) is usable. The
//! scheduler consults a [`HealthGate`] between targets: the gate only probes
//! once per check interval, and when a probe fails it blocks, polling until
//! the tunnel is back and then waiting a settle delay.
//!
//! The blocked wait has no timeout. A tunnel that never comes back keeps the
//! scan parked until an operator intervenes (or interrupts it).

use crate::pause::PauseToken;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Health monitor settings
#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    pub enabled: bool,
    /// Network interface that must exist (e.g. `tun0`)
    pub interface: String,
    /// `host:port` reached with a TCP connect
    pub probe_address: String,
    pub probe_timeout: Duration,
    /// Minimum time between checks while the scan runs
    pub check_interval: Duration,
    /// Time between checks while blocked
    pub poll_interval: Duration,
    /// Wait after recovery before resuming work
    pub settle_delay: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interface: "tun0".to_string(),
            probe_address: "8.8.8.8:53".to_string(),
            probe_timeout: Duration::from_secs(3),
            check_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(10),
        }
    }
}

/// A reachability check; `true` means the scan may proceed
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> bool;
}

/// Production check: interface present AND probe connects within the timeout
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    interface: String,
    probe_address: String,
    probe_timeout: Duration,
}

impl NetworkMonitor {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            interface: config.interface.clone(),
            probe_address: config.probe_address.clone(),
            probe_timeout: config.probe_timeout,
        }
    }

    async fn probe(&self) -> bool {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(&self.probe_address),
        )
        .await
        {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                log::debug!("Probe to {} failed: {}", self.probe_address, e);
                false
            }
            Err(_) => {
                log::debug!(
                    "Probe to {} timed out after {:?}",
                    self.probe_address,
                    self.probe_timeout
                );
                false
            }
        }
    }
}

#[async_trait]
impl HealthCheck for NetworkMonitor {
    async fn check(&self) -> bool {
        if !interface_exists(&self.interface) {
            log::debug!("Interface {} not present", self.interface);
            return false;
        }
        self.probe().await
    }
}

/// Whether a network interface with this name exists
#[cfg(unix)]
pub fn interface_exists(name: &str) -> bool {
    let Ok(c_name) = std::ffi::CString::new(name) else {
        return false;
    };
    // SAFETY: c_name is a valid NUL-terminated string for the duration of the call
    unsafe { libc::if_nametoindex(c_name.as_ptr()) != 0 }
}

#[cfg(not(unix))]
pub fn interface_exists(_name: &str) -> bool {
    false
}

/// Check used when monitoring is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn check(&self) -> bool {
        true
    }
}

/// Result of waiting out an outage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryWait {
    /// Tunnel is back; `polls` failed checks were made while waiting
    Recovered { polls: u32 },
    /// An interrupt arrived while blocked
    Interrupted,
}

/// Interval policy and blocking wait around a [`HealthCheck`]
pub struct HealthGate {
    check: Box<dyn HealthCheck>,
    enabled: bool,
    check_interval: Duration,
    poll_interval: Duration,
    settle_delay: Duration,
    last_check: Option<Instant>,
}

impl HealthGate {
    pub fn new(check: Box<dyn HealthCheck>, config: &HealthConfig) -> Self {
        Self {
            check,
            enabled: config.enabled,
            check_interval: config.check_interval,
            poll_interval: config.poll_interval,
            settle_delay: config.settle_delay,
            last_check: None,
        }
    }

    /// Gate backed by the real network monitor
    pub fn network(config: &HealthConfig) -> Self {
        Self::new(Box::new(NetworkMonitor::new(config)), config)
    }

    /// Gate that never checks anything
    pub fn disabled() -> Self {
        let config = HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        };
        Self::new(Box::new(AlwaysHealthy), &config)
    }

    /// True when monitoring is on and the check interval has elapsed
    pub fn is_due(&self) -> bool {
        self.enabled
            && self
                .last_check
                .map_or(true, |last| last.elapsed() >= self.check_interval)
    }

    /// Run the check now and restart the interval
    pub async fn check_now(&mut self) -> bool {
        let healthy = self.check.check().await;
        self.last_check = Some(Instant::now());
        healthy
    }

    /// Poll until the check passes, then wait the settle delay. Unbounded.
    pub async fn wait_for_recovery(&mut self, interrupt: &PauseToken) -> RecoveryWait {
        let mut polls = 0u32;
        loop {
            tokio::select! {
                _ = interrupt.cancelled() => return RecoveryWait::Interrupted,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            if self.check.check().await {
                break;
            }
            polls += 1;
            if polls % 12 == 0 {
                log::warn!(
                    "Network still unavailable after {:?}",
                    self.poll_interval * polls
                );
            }
        }

        log::info!(
            "Network restored, settling for {:?} before resuming",
            self.settle_delay
        );
        tokio::select! {
            _ = interrupt.cancelled() => return RecoveryWait::Interrupted,
            _ = tokio::time::sleep(self.settle_delay) => {}
        }
        self.last_check = Some(Instant::now());
        RecoveryWait::Recovered { polls }
    }
}
