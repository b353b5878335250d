//! Storage backends for servers and their event history
//!
//! This module provides a trait-based abstraction over the persistence
//! collaborator the monitoring core depends on.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async so actors and handlers can share it
//! - **Row-oriented**: Appends are single-row, reads are ordered range scans
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, good for small fleets
//! - **In-Memory**: No persistence, for testing or throwaway deployments
//!
//! ## Usage
//!
//! ```no_run
//! use fleet_monitor::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./data/status.db").await?;
//!     println!("{}", backend.get_stats().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{EventRange, HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::{HeartbeatRow, ReachabilityRow, ServerRow, UNKNOWN_ADDRESS};
