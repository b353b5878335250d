//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Probe writes and report writes do not block dashboard reads
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Uniqueness
//!
//! `servers.name` carries a UNIQUE constraint. A violating insert surfaces as
//! `StorageError::Conflict` so the registry can retry its lookup.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{EventRange, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{HeartbeatRow, ReachabilityRow, ServerRow};
use crate::id::Id;

/// SQLite storage backend
///
/// This backend stores servers and events in a local SQLite database file.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file (and its parent directory) if missing
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for concurrent readers (WAL mode, busy timeout)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use fleet_monitor::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./data/status.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref();
        let db_path_str = db_path.to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Ids are 63-bit, so they fit SQLite's signed INTEGER unchanged
    fn id_to_sql(id: Id) -> i64 {
        id.as_u64() as i64
    }

    fn id_from_sql(raw: i64) -> Id {
        Id::from_raw(raw as u64)
    }

    fn server_from_row(row: &SqliteRow) -> ServerRow {
        ServerRow {
            id: Self::id_from_sql(row.get("id")),
            name: row.get("name"),
            address: row.get("address"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            note: row.get("note"),
        }
    }

    fn reachability_from_row(row: &SqliteRow) -> ReachabilityRow {
        ReachabilityRow {
            id: Self::id_from_sql(row.get("id")),
            server_id: Self::id_from_sql(row.get("server_id")),
            timestamp: row.get("timestamp"),
            reachable: row.get("reachable"),
            latency_ms: row.get("latency_ms"),
        }
    }

    fn heartbeat_from_row(row: &SqliteRow) -> StorageResult<HeartbeatRow> {
        let raw = row
            .get::<Option<String>, _>("raw")
            .map(|json| serde_json::from_str(&json))
            .transpose()?;

        Ok(HeartbeatRow {
            id: Self::id_from_sql(row.get("id")),
            server_id: Self::id_from_sql(row.get("server_id")),
            timestamp: row.get("timestamp"),
            up_bytes: row.get("up_bytes"),
            down_bytes: row.get("down_bytes"),
            cpu_load: row.get("cpu_load"),
            mem_load: row.get("mem_load"),
            address: row.get("address"),
            raw,
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, server), fields(name = %server.name))]
    async fn insert_server(&self, server: ServerRow) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO servers (id, name, address, created_at, updated_at, note)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Self::id_to_sql(server.id))
        .bind(&server.name)
        .bind(&server.address)
        .bind(server.created_at)
        .bind(server.updated_at)
        .bind(&server.note)
        .execute(&self.pool)
        .await?;

        debug!("inserted server {}", server.id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_server_address(
        &self,
        server_id: Id,
        address: &str,
        updated_at: i64,
    ) -> StorageResult<()> {
        let result = sqlx::query("UPDATE servers SET address = ?, updated_at = ? WHERE id = ?")
            .bind(address)
            .bind(updated_at)
            .bind(Self::id_to_sql(server_id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(format!(
                "server {server_id} does not exist"
            )));
        }
        Ok(())
    }

    async fn get_server(&self, server_id: Id) -> StorageResult<Option<ServerRow>> {
        let row = sqlx::query(
            "SELECT id, name, address, created_at, updated_at, note FROM servers WHERE id = ?",
        )
        .bind(Self::id_to_sql(server_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::server_from_row))
    }

    async fn get_server_by_name(&self, name: &str) -> StorageResult<Option<ServerRow>> {
        let row = sqlx::query(
            "SELECT id, name, address, created_at, updated_at, note FROM servers WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::server_from_row))
    }

    async fn list_servers(&self) -> StorageResult<Vec<ServerRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, address, created_at, updated_at, note
            FROM servers
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::server_from_row).collect())
    }

    async fn insert_reachability(&self, event: ReachabilityRow) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reachability_events (id, server_id, timestamp, reachable, latency_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Self::id_to_sql(event.id))
        .bind(Self::id_to_sql(event.server_id))
        .bind(event.timestamp)
        .bind(event.reachable)
        .bind(event.latency_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_heartbeat(&self, event: HeartbeatRow) -> StorageResult<()> {
        let raw = event.raw.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO heartbeat_events (
                id, server_id, timestamp, up_bytes, down_bytes,
                cpu_load, mem_load, address, raw
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Self::id_to_sql(event.id))
        .bind(Self::id_to_sql(event.server_id))
        .bind(event.timestamp)
        .bind(event.up_bytes)
        .bind(event.down_bytes)
        .bind(event.cpu_load)
        .bind(event.mem_load)
        .bind(&event.address)
        .bind(raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(server_id = %range.server_id))]
    async fn query_reachability(&self, range: EventRange) -> StorageResult<Vec<ReachabilityRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, server_id, timestamp, reachable, latency_ms
            FROM reachability_events
            WHERE server_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(Self::id_to_sql(range.server_id))
        .bind(range.start)
        .bind(range.end.unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        debug!("query returned {} reachability events", rows.len());
        Ok(rows.iter().map(Self::reachability_from_row).collect())
    }

    #[instrument(skip(self), fields(server_id = %range.server_id))]
    async fn query_heartbeats(&self, range: EventRange) -> StorageResult<Vec<HeartbeatRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, server_id, timestamp, up_bytes, down_bytes,
                   cpu_load, mem_load, address, raw
            FROM heartbeat_events
            WHERE server_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(Self::id_to_sql(range.server_id))
        .bind(range.start)
        .bind(range.end.unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        debug!("query returned {} heartbeats", rows.len());
        rows.iter().map(Self::heartbeat_from_row).collect()
    }

    async fn latest_heartbeat(&self, server_id: Id) -> StorageResult<Option<HeartbeatRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, server_id, timestamp, up_bytes, down_bytes,
                   cpu_load, mem_load, address, raw
            FROM heartbeat_events
            WHERE server_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(Self::id_to_sql(server_id))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::heartbeat_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        // Simple ping query to verify connection
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let (servers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM servers")
            .fetch_one(&self.pool)
            .await?;
        let (pings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reachability_events")
            .fetch_one(&self.pool)
            .await?;
        let (heartbeats,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM heartbeat_events")
            .fetch_one(&self.pool)
            .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        Ok(format!(
            "SQLite: {} servers, {} reachability events, {} heartbeats, {:.2} MB on disk",
            servers, pings, heartbeats, file_size_mb
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
