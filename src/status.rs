//! Status page assembly
//!
//! Joins registry, classifier and aggregator output into the JSON documents
//! served to dashboards. Nothing here writes.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::aggregate::{
    Aggregator, DEFAULT_SERIES_POINTS, DEFAULT_TIMELINE_SLOTS, DEFAULT_WINDOW_SECS, LatestUsage,
    ResourcePoint, TimelineSlot,
};
use crate::clock::Clock;
use crate::error::{MonitorError, MonitorResult};
use crate::health::{HealthClassifier, ReachabilityHealth, ReportingHealth, ServerHealth};
use crate::id::Id;
use crate::storage::{EventRange, HeartbeatRow, ReachabilityRow, ServerRow, StorageBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Warn,
    Error,
}

/// Fleet-wide verdict: any down axis is an error, any reachability warning a warning
pub fn overall_status<'a>(healths: impl IntoIterator<Item = &'a ServerHealth>) -> OverallStatus {
    let mut status = OverallStatus::Ok;
    for health in healths {
        if health.is_down() {
            return OverallStatus::Error;
        }
        if health.reachability == ReachabilityHealth::Warn {
            status = OverallStatus::Warn;
        }
    }
    status
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub id: Id,
    pub name: String,
    pub address: String,
    pub reachability: ReachabilityHealth,
    pub reporting: ReportingHealth,
    pub timeline: Vec<TimelineSlot>,
    pub current: LatestUsage,
    pub resource_series: Vec<ResourcePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusPage {
    pub overall_status: OverallStatus,
    pub generated_at: i64,
    pub servers: Vec<ServerStatus>,
}

/// One server with its raw last-day history
#[derive(Debug, Clone, Serialize)]
pub struct ServerDetail {
    pub server: ServerRow,
    pub ping_data: Vec<ReachabilityRow>,
    pub heartbeat_data: Vec<HeartbeatRow>,
}

pub struct StatusBoard {
    storage: Arc<dyn StorageBackend>,
    classifier: HealthClassifier,
    aggregator: Aggregator,
    clock: Arc<dyn Clock>,
}

impl StatusBoard {
    pub fn new(storage: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            classifier: HealthClassifier::new(storage.clone()),
            aggregator: Aggregator::new(storage.clone()),
            storage,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub async fn page(&self) -> MonitorResult<StatusPage> {
        let now = self.clock.now_secs();
        let servers = self.storage.list_servers().await?;

        let mut entries = Vec::with_capacity(servers.len());
        let mut healths = Vec::with_capacity(servers.len());
        for server in servers {
            let health = self.classifier.classify(server.id, now).await?;
            let timeline = self
                .aggregator
                .timeline(server.id, now, DEFAULT_WINDOW_SECS, DEFAULT_TIMELINE_SLOTS)
                .await?;
            let current = self.aggregator.latest_usage(server.id).await?;
            let resource_series = self
                .aggregator
                .resource_series(server.id, now, DEFAULT_WINDOW_SECS, DEFAULT_SERIES_POINTS)
                .await?;

            healths.push(health);
            entries.push(ServerStatus {
                id: server.id,
                name: server.name,
                address: server.address,
                reachability: health.reachability,
                reporting: health.reporting,
                timeline,
                current,
                resource_series,
            });
        }

        Ok(StatusPage {
            overall_status: overall_status(&healths),
            generated_at: now,
            servers: entries,
        })
    }

    pub async fn detail(&self, server_id: Id) -> MonitorResult<ServerDetail> {
        let server = self
            .storage
            .get_server(server_id)
            .await?
            .ok_or_else(|| MonitorError::NotFound(server_id.to_string()))?;

        let range = EventRange::since(server_id, self.clock.now_secs() - DEFAULT_WINDOW_SECS);
        Ok(ServerDetail {
            server,
            ping_data: self.storage.query_reachability(range).await?,
            heartbeat_data: self.storage.query_heartbeats(range).await?,
        })
    }
}
