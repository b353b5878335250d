//! ProberActor - drives reachability cycles on a fixed cadence
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → ReachabilityProber::run_cycle → rows in storage
//!     ↑
//!     └─── Commands (ProbeNow, UpdateInterval, Shutdown)
//! ```
//!
//! Commands are only observed between cycles, so a shutdown never cuts a
//! cycle short and no cycle starts after it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::error::MonitorResult;
use crate::prober::{CycleReport, ReachabilityProber};

use super::messages::ProberCommand;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Shorter intervals (including zero) are raised to this
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(1);

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval(period.max(MIN_PROBE_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

pub struct ProberActor {
    prober: Arc<ReachabilityProber>,
    command_rx: mpsc::Receiver<ProberCommand>,
    interval_duration: Duration,
}

impl ProberActor {
    pub fn new(
        prober: Arc<ReachabilityProber>,
        command_rx: mpsc::Receiver<ProberCommand>,
        interval_duration: Duration,
    ) -> Self {
        Self {
            prober,
            command_rx,
            interval_duration,
        }
    }

    /// Runs until a Shutdown command arrives or every handle is dropped
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        info!("starting prober actor");

        let mut ticker = new_ticker(self.interval_duration);

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }

                        Some(ProberCommand::ProbeNow { respond_to }) => {
                            debug!("received ProbeNow command");
                            let _ = respond_to.send(self.cycle().await);
                        }

                        Some(ProberCommand::UpdateInterval { interval_secs }) => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration =
                                Duration::from_secs(interval_secs).max(MIN_PROBE_INTERVAL);
                            ticker = new_ticker(self.interval_duration);
                            // interval() fires immediately; skip that tick
                            ticker.reset();
                        }

                        Some(ProberCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        error!("probe cycle failed: {e}");
                    }
                }
            }
        }

        info!("prober actor stopped");
    }

    async fn cycle(&self) -> MonitorResult<CycleReport> {
        self.prober.run_cycle().await
    }
}

/// Handle for controlling a ProberActor
#[derive(Clone)]
pub struct ProberHandle {
    sender: mpsc::Sender<ProberCommand>,
}

impl ProberHandle {
    /// Spawn the actor; its first cycle runs immediately
    pub fn spawn(prober: Arc<ReachabilityProber>, interval_duration: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = ProberActor::new(prober, cmd_rx, interval_duration);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a cycle now and wait for its report
    pub async fn probe_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ProberCommand::ProbeNow { respond_to: tx })
            .await
            .context("prober actor is gone")?;

        Ok(rx.await.context("prober actor dropped the request")??)
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(ProberCommand::UpdateInterval { interval_secs })
            .await
            .context("prober actor is gone")?;
        Ok(())
    }

    /// Ask the actor to stop and wait until it has
    pub async fn shutdown(self) {
        let _ = self.sender.send(ProberCommand::Shutdown).await;
        self.sender.closed().await;
    }
}
