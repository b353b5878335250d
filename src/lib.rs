//! Fleet health monitoring
//!
//! Agents push resource reports to a hub; the hub probes every registered
//! host, classifies health on two axes (reachability and reporting) and
//! aggregates history into fixed-resolution timelines for status pages.
//!
//! ## Components
//!
//! - [`id`]: time-ordered unique identifiers
//! - [`registry`]: name/id resolution to durable server identities
//! - [`heartbeat`]: agent report ingestion
//! - [`prober`] and [`actors`]: periodic reachability probing
//! - [`health`]: OK/WARN/DOWN classification
//! - [`aggregate`]: status timelines and resource series
//! - [`status`]: status page assembly
//! - [`storage`]: pluggable persistence (SQLite, in-memory)

pub mod actors;
pub mod agent;
pub mod aggregate;
#[cfg(feature = "api")]
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod heartbeat;
pub mod id;
pub mod prober;
pub mod registry;
pub mod status;
pub mod storage;

pub use error::{MonitorError, MonitorResult};
pub use id::{Id, IdGenerator};
