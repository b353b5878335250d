//! Request and response bodies of the HTTP API
//!
//! Domain documents (`StatusPage`, `ServerDetail`, `ServerRow`) serialize
//! themselves; the types here only wrap them in the envelopes clients expect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::heartbeat::RecordedHeartbeat;
use crate::prober::CycleReport;
use crate::storage::ServerRow;

/// POST /api/heartbeat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAccepted {
    pub ok: bool,

    #[serde(flatten)]
    pub recorded: RecordedHeartbeat,
}

/// POST /api/register request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,

    /// Defaults to the caller's address
    #[serde(default)]
    pub address: Option<String>,
}

/// Single server envelope
#[derive(Debug, Clone, Serialize)]
pub struct ServerResponse {
    pub server: ServerRow,
}

/// GET /api/servers response
#[derive(Debug, Clone, Serialize)]
pub struct ServersResponse {
    pub servers: Vec<ServerRow>,
}

/// POST /api/probe response
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResponse {
    pub ok: bool,
    pub report: CycleReport,
}

/// GET /api/health response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub storage: StorageHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageHealth {
    pub healthy: bool,
    pub message: String,
    pub metadata: HashMap<String, String>,
    pub stats: String,
}
