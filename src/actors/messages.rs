//! Message types for actor communication
//!
//! Commands are sent to a specific actor over its mpsc channel. Request/response
//! commands carry a oneshot sender for the reply.

use tokio::sync::oneshot;

use crate::error::MonitorResult;
use crate::prober::CycleReport;

/// Commands that can be sent to a ProberActor
#[derive(Debug)]
pub enum ProberCommand {
    /// Run a cycle immediately, bypassing the interval timer
    ProbeNow {
        respond_to: oneshot::Sender<MonitorResult<CycleReport>>,
    },

    /// Change the cadence; the timer restarts from now
    UpdateInterval { interval_secs: u64 },

    /// Stop after the cycle in flight (if any) completes
    Shutdown,
}
