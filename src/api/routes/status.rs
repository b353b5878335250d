//! Status page and on-demand probing

use axum::{Json, extract::State};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::ProbeResponse,
    },
    status::StatusPage,
};

/// GET /api/status
pub async fn status_page(State(state): State<ApiState>) -> ApiResult<Json<StatusPage>> {
    Ok(Json(state.board.page().await?))
}

/// POST /api/probe
///
/// Runs a reachability cycle immediately and returns its counts
pub async fn probe_now(State(state): State<ApiState>) -> ApiResult<Json<ProbeResponse>> {
    let prober = state
        .prober
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("prober is not running".to_string()))?;

    let report = prober.probe_now().await?;
    Ok(Json(ProbeResponse { ok: true, report }))
}
