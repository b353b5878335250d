//! Actor-based background work
//!
//! Each actor runs as an independent tokio task and is controlled through a
//! cloneable handle that owns the sending half of its mpsc command channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!                ┌─────────────────┐
//!                │   Hub (main)    │
//!                └───────┬─────────┘
//!            spawns      │       serves
//!          ┌─────────────┴─────────────┐
//!  ┌───────▼───────┐           ┌───────▼───────┐
//!  │  ProberActor  │           │   HTTP API    │
//!  └───────┬───────┘           └───────┬───────┘
//!          │ reachability rows         │ heartbeats, reads
//!          └─────────────┬─────────────┘
//!                ┌───────▼───────┐
//!                │StorageBackend │
//!                └───────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc channel into the actor (`ProbeNow`, `UpdateInterval`, `Shutdown`)
//! 2. **Request/Response**: oneshot channels carried inside commands

pub mod messages;
pub mod prober;

pub use prober::{DEFAULT_PROBE_INTERVAL, MIN_PROBE_INTERVAL, ProberActor, ProberHandle};
