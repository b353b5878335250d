//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::{HeartbeatRow, ReachabilityRow, ServerRow};
use crate::id::Id;

/// Time range over one server's events
///
/// `start` is inclusive, `end` (when present) is exclusive. Both are Unix
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRange {
    pub server_id: Id,
    pub start: i64,
    pub end: Option<i64>,
}

impl EventRange {
    /// Every event at or after `start`
    pub fn since(server_id: Id, start: i64) -> Self {
        Self {
            server_id,
            start,
            end: None,
        }
    }

    /// Events in `[start, end)`
    pub fn between(server_id: Id, start: i64, end: i64) -> Self {
        Self {
            server_id,
            start,
            end: Some(end),
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && self.end.is_none_or(|end| timestamp < end)
    }
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Trait for persistent storage backends
///
/// The monitoring core only needs row inserts, point lookups and ordered
/// range scans; aggregation happens in-process.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`: the prober actor and the HTTP
/// handlers share one backend.
///
/// ## Uniqueness
///
/// `insert_server` must reject a second server with an existing name by
/// returning `StorageError::Conflict`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a new server row
    async fn insert_server(&self, server: ServerRow) -> StorageResult<()>;

    /// Refresh a server's last-known address and update timestamp
    async fn update_server_address(
        &self,
        server_id: Id,
        address: &str,
        updated_at: i64,
    ) -> StorageResult<()>;

    async fn get_server(&self, server_id: Id) -> StorageResult<Option<ServerRow>>;

    async fn get_server_by_name(&self, name: &str) -> StorageResult<Option<ServerRow>>;

    /// All servers, most recently created first
    async fn list_servers(&self) -> StorageResult<Vec<ServerRow>>;

    /// Append one reachability event
    async fn insert_reachability(&self, event: ReachabilityRow) -> StorageResult<()>;

    /// Append one heartbeat event
    async fn insert_heartbeat(&self, event: HeartbeatRow) -> StorageResult<()>;

    /// Reachability events in range, ordered by (timestamp, id) ascending
    async fn query_reachability(&self, range: EventRange) -> StorageResult<Vec<ReachabilityRow>>;

    /// Heartbeat events in range, ordered by (timestamp, id) ascending
    async fn query_heartbeats(&self, range: EventRange) -> StorageResult<Vec<HeartbeatRow>>;

    /// The most recent heartbeat of a server, if any
    async fn latest_heartbeat(&self, server_id: Id) -> StorageResult<Option<HeartbeatRow>>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics
    ///
    /// Returns human-readable stats about the backend
    /// (e.g., "SQLite: 12 servers, 1.2M events, 450MB on disk").
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
