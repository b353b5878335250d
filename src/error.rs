//! Errors surfaced by the monitoring core
//!
//! Identity and registry failures propagate to the immediate caller. Probe
//! failures never appear here: they are recorded as unreachable events.

use thiserror::Error;

use crate::id::IdError;
use crate::storage::StorageError;

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Identity allocation failed (e.g. the clock moved backwards)
    #[error("identity allocation failed: {0}")]
    Identity(#[from] IdError),

    /// The request named neither a server id nor a server name
    #[error("a server id or server name is required")]
    UnresolvableServer,

    /// The supplied server id does not exist
    #[error("server '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
