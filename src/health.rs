//! Two-axis health classification
//!
//! Reachability comes from the hub's own probes, reporting from agent
//! heartbeats. The decision functions are pure over event slices; the
//! `HealthClassifier` only fetches the windows they need.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::id::Id;
use crate::storage::{EventRange, HeartbeatRow, ReachabilityRow, StorageBackend, StorageResult};

/// The latest probe inside this window decides OK
pub const REACHABILITY_RECENT_SECS: i64 = 120;

/// Any successful probe inside this window downgrades DOWN to WARN
pub const REACHABILITY_GRACE_SECS: i64 = 600;

/// A heartbeat inside this window means the agent is reporting
pub const REPORTING_WINDOW_SECS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReachabilityHealth {
    Ok,
    Warn,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingHealth {
    Ok,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHealth {
    pub reachability: ReachabilityHealth,
    pub reporting: ReportingHealth,
}

impl ServerHealth {
    pub fn is_down(&self) -> bool {
        self.reachability == ReachabilityHealth::Down || self.reporting == ReportingHealth::Down
    }
}

/// Classify probe history
///
/// `events` must be ordered by (timestamp, id); anything newer than `now` is
/// ignored.
pub fn classify_reachability(events: &[ReachabilityRow], now: i64) -> ReachabilityHealth {
    let visible = events.iter().filter(|e| e.timestamp <= now);

    let latest_recent = visible
        .clone()
        .filter(|e| e.timestamp >= now - REACHABILITY_RECENT_SECS)
        .next_back();
    if latest_recent.is_some_and(|e| e.reachable) {
        return ReachabilityHealth::Ok;
    }

    let mut grace = visible.filter(|e| e.timestamp >= now - REACHABILITY_GRACE_SECS);
    if grace.any(|e| e.reachable) {
        ReachabilityHealth::Warn
    } else {
        ReachabilityHealth::Down
    }
}

pub fn classify_reporting(events: &[HeartbeatRow], now: i64) -> ReportingHealth {
    let reporting = events
        .iter()
        .any(|e| e.timestamp <= now && e.timestamp >= now - REPORTING_WINDOW_SECS);

    if reporting {
        ReportingHealth::Ok
    } else {
        ReportingHealth::Down
    }
}

pub struct HealthClassifier {
    storage: Arc<dyn StorageBackend>,
}

impl HealthClassifier {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn classify(&self, server_id: Id, now: i64) -> StorageResult<ServerHealth> {
        let pings = self
            .storage
            .query_reachability(EventRange::between(
                server_id,
                now - REACHABILITY_GRACE_SECS,
                now + 1,
            ))
            .await?;
        let heartbeats = self
            .storage
            .query_heartbeats(EventRange::between(
                server_id,
                now - REPORTING_WINDOW_SECS,
                now + 1,
            ))
            .await?;

        Ok(ServerHealth {
            reachability: classify_reachability(&pings, now),
            reporting: classify_reporting(&heartbeats, now),
        })
    }
}
