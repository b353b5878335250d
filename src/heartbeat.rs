//! Agent report ingestion
//!
//! Every accepted report becomes exactly one heartbeat row, stamped with the
//! hub clock. Metric values are stored as received.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::error::MonitorResult;
use crate::id::{Id, IdGenerator};
use crate::registry::{ServerLookup, ServerRegistry};
use crate::storage::{HeartbeatRow, StorageBackend, UNKNOWN_ADDRESS};

/// Report body pushed by an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default)]
    pub cpu_load: Option<f64>,

    #[serde(default)]
    pub mem_load: Option<f64>,

    #[serde(default)]
    pub up_bytes: i64,

    #[serde(default)]
    pub down_bytes: i64,
}

impl HeartbeatReport {
    /// An unknown source never overwrites a known address
    fn lookup(&self, source_address: &str) -> ServerLookup {
        ServerLookup {
            id: self.server_id.clone(),
            name: self.server_name.clone(),
            address: (source_address != UNKNOWN_ADDRESS).then(|| source_address.to_string()),
        }
    }
}

/// Identities produced by one accepted report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedHeartbeat {
    pub server_id: Id,
    pub heartbeat_id: Id,
}

pub struct HeartbeatRecorder {
    registry: Arc<ServerRegistry>,
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl HeartbeatRecorder {
    pub fn new(
        registry: Arc<ServerRegistry>,
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            storage,
            ids,
            clock,
        }
    }

    /// Resolve the reporting server (registering it if needed) and append one
    /// heartbeat row. `raw` is the request body as received, kept for
    /// diagnostics.
    #[instrument(skip(self, report, raw), fields(server_name = ?report.server_name))]
    pub async fn record(
        &self,
        report: HeartbeatReport,
        source_address: &str,
        raw: Option<serde_json::Value>,
    ) -> MonitorResult<RecordedHeartbeat> {
        let server = self
            .registry
            .resolve(&report.lookup(source_address))
            .await?;

        let row = HeartbeatRow {
            id: self.ids.next_id()?,
            server_id: server.id,
            timestamp: self.clock.now_secs(),
            up_bytes: report.up_bytes,
            down_bytes: report.down_bytes,
            cpu_load: report.cpu_load,
            mem_load: report.mem_load,
            address: Some(source_address.to_string()),
            raw,
        };
        let recorded = RecordedHeartbeat {
            server_id: row.server_id,
            heartbeat_id: row.id,
        };

        self.storage.insert_heartbeat(row).await?;
        debug!(
            "recorded heartbeat {} for server {}",
            recorded.heartbeat_id, recorded.server_id
        );

        Ok(recorded)
    }
}
