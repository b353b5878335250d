//! Server registry endpoints

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
};

use crate::{
    api::{
        error::ApiResult,
        state::ApiState,
        types::{RegisterRequest, ServerResponse, ServersResponse},
        utils::{client_address, parse_server_id},
    },
    status::ServerDetail,
    storage::UNKNOWN_ADDRESS,
};

/// POST /api/register
///
/// Idempotent by name; the address defaults to the caller's. An unknown
/// caller address never replaces a known one.
pub async fn register(
    State(state): State<ApiState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<ServerResponse>> {
    let address = request
        .address
        .unwrap_or_else(|| client_address(&headers, peer.map(|ConnectInfo(addr)| addr)));
    let address = (address != UNKNOWN_ADDRESS).then_some(address);

    let server = state
        .registry
        .register(&request.name, address.as_deref())
        .await?;

    Ok(Json(ServerResponse { server }))
}

/// GET /api/servers
pub async fn list_servers(State(state): State<ApiState>) -> ApiResult<Json<ServersResponse>> {
    let servers = state.registry.list().await?;
    Ok(Json(ServersResponse { servers }))
}

/// GET /api/servers/:id
///
/// The server row plus its last day of reachability and heartbeat rows
pub async fn get_server(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ServerDetail>> {
    let id = parse_server_id(&id)?;
    Ok(Json(state.board.detail(id).await?))
}
