//! Active reachability probing
//!
//! One cycle enumerates every registered server, pings each under a bounded
//! concurrency ceiling and writes exactly one reachability row per server.
//! Probe failures are data, not errors: they are recorded as unreachable.
//!
//! ## Message Flow
//!
//! ```text
//! list_servers → buffered pings (≤ concurrency, each under timeout) → insert rows in enumeration order
//! ```

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument, trace, warn};

use crate::clock::Clock;
use crate::error::MonitorResult;
use crate::id::IdGenerator;
use crate::storage::{ReachabilityRow, ServerRow, StorageBackend, UNKNOWN_ADDRESS};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Why a single probe did not report the host as reachable
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("ping exited unsuccessfully: {0}")]
    ExitStatus(String),

    #[error("failed to spawn ping: {0}")]
    Spawn(#[from] std::io::Error),

    /// Never handed to the system ping (sentinel, empty, or option-like)
    #[error("address '{0}' cannot be probed")]
    InvalidAddress(String),
}

/// A single reachability check
///
/// `Ok(latency)` means reachable; the latency is advisory and may be absent.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, address: &str) -> Result<Option<f64>, ProbeFailure>;
}

static LATENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:time|时间)\s*[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms")
        .expect("latency pattern is valid")
});

/// Best-effort round-trip time from ping output
pub fn parse_latency(output: &str) -> Option<f64> {
    LATENCY_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Hostnames and IPv4/IPv6 literals only
fn probeable(address: &str) -> bool {
    !address.is_empty()
        && address != UNKNOWN_ADDRESS
        && !address.starts_with('-')
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_' | '%'))
}

/// Shells out to the platform `ping` for a single echo request
#[derive(Debug, Clone)]
pub struct SystemPinger {
    timeout: Duration,
}

impl SystemPinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(address: &str) -> Command {
        let mut cmd = Command::new("ping");
        if cfg!(windows) {
            cmd.args(["-n", "1", "-w", "1000"]);
        } else {
            cmd.args(["-c", "1", "-W", "1"]);
        }
        cmd.arg(address)
            .stdin(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Pinger for SystemPinger {
    async fn ping(&self, address: &str) -> Result<Option<f64>, ProbeFailure> {
        if !probeable(address) {
            return Err(ProbeFailure::InvalidAddress(address.to_string()));
        }

        // dropping the output future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, Self::command(address).output())
            .await
            .map_err(|_| ProbeFailure::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(ProbeFailure::ExitStatus(output.status.to_string()));
        }

        Ok(parse_latency(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Fan-out limits for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Counts for one completed cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub probed: usize,
    pub reachable: usize,
    pub written: usize,
}

pub struct ReachabilityProber {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
    pinger: Arc<dyn Pinger>,
    settings: ProbeSettings,
}

impl ReachabilityProber {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
        pinger: Arc<dyn Pinger>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            storage,
            ids,
            clock,
            pinger,
            settings,
        }
    }

    /// Probe every registered server once
    ///
    /// Only a failure to enumerate servers fails the cycle. Per-server write
    /// errors are logged and skipped.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> MonitorResult<CycleReport> {
        let servers = self.storage.list_servers().await?;
        let timestamp = self.clock.now_secs();
        let mut report = CycleReport::default();

        let mut outcomes = stream::iter(servers)
            .map(|server| async move {
                let outcome = self.probe(&server).await;
                (server, outcome)
            })
            .buffered(self.settings.concurrency.max(1));

        while let Some((server, outcome)) = outcomes.next().await {
            report.probed += 1;

            let (reachable, latency_ms) = match outcome {
                Ok(latency) => (true, latency),
                Err(failure) => {
                    debug!("{} ({}) unreachable: {failure}", server.name, server.address);
                    (false, None)
                }
            };
            if reachable {
                report.reachable += 1;
            }

            let id = match self.ids.next_id() {
                Ok(id) => id,
                Err(e) => {
                    warn!("skipping reachability row for {}: {e}", server.name);
                    continue;
                }
            };
            let row = ReachabilityRow {
                id,
                server_id: server.id,
                timestamp,
                reachable,
                latency_ms,
            };

            match self.storage.insert_reachability(row).await {
                Ok(()) => report.written += 1,
                Err(e) => warn!("failed to record reachability for {}: {e}", server.name),
            }
        }

        debug!(
            "probe cycle done: {}/{} reachable, {} written",
            report.reachable, report.probed, report.written
        );
        Ok(report)
    }

    async fn probe(&self, server: &ServerRow) -> Result<Option<f64>, ProbeFailure> {
        trace!("probing {} at {}", server.name, server.address);
        tokio::time::timeout(self.settings.timeout, self.pinger.ping(&server.address))
            .await
            .unwrap_or(Err(ProbeFailure::Timeout(self.settings.timeout)))
    }
}
