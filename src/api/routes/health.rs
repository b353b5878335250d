//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{HealthResponse, StorageHealth},
};

/// GET /api/health
///
/// Reports the storage backend's health alongside its row counts
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<HealthResponse>> {
    let health = state.storage.health_check().await?;
    let stats = state.storage.get_stats().await?;

    Ok(Json(HealthResponse {
        status: if health.healthy { "ok" } else { "degraded" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage: StorageHealth {
            healthy: health.healthy,
            message: health.message,
            metadata: health.metadata,
            stats,
        },
    }))
}
