//! Time-bucketed summaries of event history
//!
//! Two fixed-resolution views over the last day of a server's events:
//!
//! - **Status timeline**: one slot per 5 minutes by default, each carrying a
//!   ping verdict and whether any heartbeat arrived.
//! - **Resource series**: averaged CPU and memory load at a coarser resolution
//!   for sparklines.
//!
//! Both are computed in a single pass over the fetched rows and are total:
//! zero events produce a fully-populated, empty-valued result.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::id::Id;
use crate::storage::{EventRange, HeartbeatRow, ReachabilityRow, StorageBackend, StorageResult};

pub const DEFAULT_WINDOW_SECS: i64 = 24 * 3600;
pub const DEFAULT_TIMELINE_SLOTS: usize = 288;
pub const DEFAULT_SERIES_POINTS: usize = 60;

/// Reachable fraction at or above which a slot counts as OK, as a ratio
const OK_NUMERATOR: usize = 4;
const OK_DENOMINATOR: usize = 5;

/// Ping verdict for one timeline slot
///
/// Serialized as the integers 0, 1 and -1 that status renderers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingState {
    NoData,
    Ok,
    Partial,
}

impl PingState {
    pub fn as_i8(self) -> i8 {
        match self {
            PingState::NoData => 0,
            PingState::Ok => 1,
            PingState::Partial => -1,
        }
    }

    fn from_counts(reachable: usize, total: usize) -> Self {
        if total == 0 {
            PingState::NoData
        } else if reachable * OK_DENOMINATOR >= total * OK_NUMERATOR {
            PingState::Ok
        } else {
            PingState::Partial
        }
    }
}

impl Serialize for PingState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineSlot {
    pub ping: PingState,

    /// 1 if any heartbeat landed in the slot
    pub heartbeat: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourcePoint {
    pub timestamp: i64,
    pub cpu: Option<f64>,
    pub mem: Option<f64>,
}

/// Most recent reported load
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatestUsage {
    pub cpu: Option<f64>,
    pub mem: Option<f64>,
}

/// Slot geometry shared by the fetch and the bucketing pass
fn timeline_geometry(now: i64, window: i64, slots: usize) -> (i64, i64, i64) {
    let width = (window / slots.max(1) as i64).max(1);
    let start = now - window;
    let end = start + width * slots as i64;
    (start, width, end)
}

/// Bucket events into `slots` equal slots ending at `now`, oldest first
///
/// Events outside `[start, start + width * slots)` are ignored.
pub fn build_timeline(
    pings: &[ReachabilityRow],
    heartbeats: &[HeartbeatRow],
    now: i64,
    window: i64,
    slots: usize,
) -> Vec<TimelineSlot> {
    let (start, width, end) = timeline_geometry(now, window, slots);
    let slot_of = |t: i64| ((start..end).contains(&t)).then(|| ((t - start) / width) as usize);

    let mut totals = vec![0usize; slots];
    let mut reachable = vec![0usize; slots];
    let mut seen_heartbeat = vec![false; slots];

    for ping in pings {
        if let Some(i) = slot_of(ping.timestamp) {
            totals[i] += 1;
            if ping.reachable {
                reachable[i] += 1;
            }
        }
    }
    for heartbeat in heartbeats {
        if let Some(i) = slot_of(heartbeat.timestamp) {
            seen_heartbeat[i] = true;
        }
    }

    (0..slots)
        .map(|i| TimelineSlot {
            ping: PingState::from_counts(reachable[i], totals[i]),
            heartbeat: u8::from(seen_heartbeat[i]),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: u32,
}

impl Accumulator {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Average CPU and memory into `points` equal buckets ending at `now`
///
/// Heartbeats must already satisfy `timestamp >= now - window`; anything past
/// the last bucket is clamped into it. A null metric is excluded from its own
/// average only.
pub fn build_resource_series(
    heartbeats: &[HeartbeatRow],
    now: i64,
    window: i64,
    points: usize,
) -> Vec<ResourcePoint> {
    if points == 0 {
        return Vec::new();
    }

    let start = now - window;
    let width = window.max(1) as f64 / points as f64;
    let mut cpu = vec![Accumulator::default(); points];
    let mut mem = vec![Accumulator::default(); points];

    for heartbeat in heartbeats {
        let offset = (heartbeat.timestamp - start) as f64;
        if offset < 0.0 {
            continue;
        }
        let index = ((offset / width).floor() as usize).min(points - 1);
        cpu[index].add(heartbeat.cpu_load);
        mem[index].add(heartbeat.mem_load);
    }

    (0..points)
        .map(|i| ResourcePoint {
            timestamp: start + (i as f64 * width) as i64,
            cpu: cpu[i].mean(),
            mem: mem[i].mean(),
        })
        .collect()
}

/// Storage-backed wrapper around the bucketing functions
pub struct Aggregator {
    storage: Arc<dyn StorageBackend>,
}

impl Aggregator {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn timeline(
        &self,
        server_id: Id,
        now: i64,
        window: i64,
        slots: usize,
    ) -> StorageResult<Vec<TimelineSlot>> {
        let (start, _, end) = timeline_geometry(now, window, slots);
        let range = EventRange::between(server_id, start, end);

        let pings = self.storage.query_reachability(range).await?;
        let heartbeats = self.storage.query_heartbeats(range).await?;

        Ok(build_timeline(&pings, &heartbeats, now, window, slots))
    }

    pub async fn resource_series(
        &self,
        server_id: Id,
        now: i64,
        window: i64,
        points: usize,
    ) -> StorageResult<Vec<ResourcePoint>> {
        let heartbeats = self
            .storage
            .query_heartbeats(EventRange::since(server_id, now - window))
            .await?;

        Ok(build_resource_series(&heartbeats, now, window, points))
    }

    pub async fn latest_usage(&self, server_id: Id) -> StorageResult<LatestUsage> {
        Ok(self
            .storage
            .latest_heartbeat(server_id)
            .await?
            .map(|hb| LatestUsage {
                cpu: hb.cpu_load,
                mem: hb.mem_load,
            })
            .unwrap_or_default())
    }
}
