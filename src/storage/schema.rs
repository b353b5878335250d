//! Row definitions for the three persisted tables
//!
//! - `servers`: one row per monitored host, unique by name
//! - `reachability_events`: one row per server per probe cycle
//! - `heartbeat_events`: one row per agent report
//!
//! Event rows are append-only. Timestamps are Unix seconds from the hub clock.

use serde::{Deserialize, Serialize};

use crate::id::Id;

/// Address stored for servers registered without a known source address
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// A registered server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRow {
    /// Immutable identity
    pub id: Id,

    /// Unique display name chosen by the operator
    pub name: String,

    /// Last-known network address (refreshed on every report)
    pub address: String,

    pub created_at: i64,

    pub updated_at: i64,

    /// Free-text operator note
    pub note: Option<String>,
}

/// Outcome of probing one server in one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachabilityRow {
    pub id: Id,
    pub server_id: Id,
    pub timestamp: i64,
    pub reachable: bool,

    /// Round-trip time, only when reachable and parseable from the probe output
    pub latency_ms: Option<f64>,
}

/// One resource-usage sample pushed by an agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatRow {
    pub id: Id,
    pub server_id: Id,
    pub timestamp: i64,

    /// Cumulative bytes sent, as reported
    pub up_bytes: i64,

    /// Cumulative bytes received, as reported
    pub down_bytes: i64,

    /// CPU utilisation percentage
    pub cpu_load: Option<f64>,

    /// Memory utilisation percentage
    pub mem_load: Option<f64>,

    /// Source address the report arrived from
    pub address: Option<String>,

    /// Snapshot of the request body, kept for diagnostics
    #[serde(skip_serializing)]
    pub raw: Option<serde_json::Value>,
}

impl ReachabilityRow {
    /// Ordering key within one server: timestamp, then allocation order
    pub fn sort_key(&self) -> (i64, Id) {
        (self.timestamp, self.id)
    }
}

impl HeartbeatRow {
    pub fn sort_key(&self) -> (i64, Id) {
        (self.timestamp, self.id)
    }
}
