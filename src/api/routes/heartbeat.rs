//! Agent ingest endpoint

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde_json::Value;
use tracing::instrument;

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::HeartbeatAccepted,
        utils::client_address,
    },
    heartbeat::HeartbeatReport,
};

/// POST /api/heartbeat
///
/// Records one report; the body is also kept verbatim as the raw snapshot
#[instrument(skip_all)]
pub async fn post_heartbeat(
    State(state): State<ApiState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Json<HeartbeatAccepted>> {
    let report: HeartbeatReport = serde_json::from_value(body.clone())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid heartbeat: {e}")))?;
    let source = client_address(&headers, peer.map(|ConnectInfo(addr)| addr));

    let recorded = state.recorder.record(report, &source, Some(body)).await?;

    Ok(Json(HeartbeatAccepted { ok: true, recorded }))
}
