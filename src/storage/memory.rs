//! In-memory storage backend (no persistence)
//!
//! This backend keeps every table in process memory behind an async `RwLock`.
//! It's useful for:
//! - Testing without database dependencies
//! - Running the hub with `storage.backend = "none"`
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **Unbounded**: Nothing is ever evicted

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{EventRange, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{HeartbeatRow, ReachabilityRow, ServerRow};
use crate::id::Id;

#[derive(Debug, Default)]
struct Tables {
    servers: HashMap<Id, ServerRow>,

    /// name -> id, enforces name uniqueness
    names: HashMap<String, Id>,

    /// Per-server events, kept sorted by (timestamp, id)
    reachability: HashMap<Id, Vec<ReachabilityRow>>,
    heartbeats: HashMap<Id, Vec<HeartbeatRow>>,
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_server(&self, server: ServerRow) -> StorageResult<()> {
        let mut tables = self.tables.write().await;

        if tables.names.contains_key(&server.name) {
            return Err(StorageError::Conflict(format!(
                "server name '{}' already exists",
                server.name
            )));
        }
        if tables.servers.contains_key(&server.id) {
            return Err(StorageError::Conflict(format!(
                "server id {} already exists",
                server.id
            )));
        }

        debug!("in-memory backend: inserting server {}", server.name);
        tables.names.insert(server.name.clone(), server.id);
        tables.servers.insert(server.id, server);
        Ok(())
    }

    async fn update_server_address(
        &self,
        server_id: Id,
        address: &str,
        updated_at: i64,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let server = tables
            .servers
            .get_mut(&server_id)
            .ok_or_else(|| StorageError::QueryFailed(format!("server {server_id} does not exist")))?;

        server.address = address.to_string();
        server.updated_at = updated_at;
        Ok(())
    }

    async fn get_server(&self, server_id: Id) -> StorageResult<Option<ServerRow>> {
        Ok(self.tables.read().await.servers.get(&server_id).cloned())
    }

    async fn get_server_by_name(&self, name: &str) -> StorageResult<Option<ServerRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .names
            .get(name)
            .and_then(|id| tables.servers.get(id))
            .cloned())
    }

    async fn list_servers(&self) -> StorageResult<Vec<ServerRow>> {
        let tables = self.tables.read().await;
        let mut servers: Vec<ServerRow> = tables.servers.values().cloned().collect();
        servers.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(servers)
    }

    async fn insert_reachability(&self, event: ReachabilityRow) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let events = tables.reachability.entry(event.server_id).or_default();
        let position = events.partition_point(|e| e.sort_key() <= event.sort_key());
        events.insert(position, event);
        Ok(())
    }

    async fn insert_heartbeat(&self, event: HeartbeatRow) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let events = tables.heartbeats.entry(event.server_id).or_default();
        let position = events.partition_point(|e| e.sort_key() <= event.sort_key());
        events.insert(position, event);
        Ok(())
    }

    async fn query_reachability(&self, range: EventRange) -> StorageResult<Vec<ReachabilityRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reachability
            .get(&range.server_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| range.contains(e.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query_heartbeats(&self, range: EventRange) -> StorageResult<Vec<HeartbeatRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .heartbeats
            .get(&range.server_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| range.contains(e.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_heartbeat(&self, server_id: Id) -> StorageResult<Option<HeartbeatRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .heartbeats
            .get(&server_id)
            .and_then(|events| events.last())
            .cloned())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let tables = self.tables.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("servers".to_string(), tables.servers.len().to_string()),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let tables = self.tables.read().await;
        let pings: usize = tables.reachability.values().map(Vec::len).sum();
        let heartbeats: usize = tables.heartbeats.values().map(Vec::len).sum();
        Ok(format!(
            "In-Memory: {} servers, {} reachability events, {} heartbeats",
            tables.servers.len(),
            pings,
            heartbeats
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
