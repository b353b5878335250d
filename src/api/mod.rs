//! HTTP API for agents and dashboards
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Shared state** holding the registry, recorder, status board and prober handle
//!
//! ## Endpoints
//!
//! - `POST /api/heartbeat` - Record an agent report
//! - `POST /api/register` - Register a server by name
//! - `GET /api/servers` - List registered servers
//! - `GET /api/servers/:id` - Server detail with its last day of events
//! - `GET /api/status` - Full status page
//! - `POST /api/probe` - Run a reachability cycle now
//! - `GET /api/health` - Storage health check

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod utils;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    pub bind_addr: SocketAddr,

    /// Enable CORS for dashboards served elsewhere
    pub enable_cors: bool,
}

impl From<&crate::config::ApiSettings> for ApiConfig {
    fn from(settings: &crate::config::ApiSettings) -> Self {
        Self {
            bind_addr: settings.bind,
            enable_cors: settings.enable_cors,
        }
    }
}

/// Build the router with all routes
pub fn router(state: ApiState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/api/heartbeat", post(routes::heartbeat::post_heartbeat))
        .route("/api/register", post(routes::servers::register))
        .route("/api/servers", get(routes::servers::list_servers))
        .route("/api/servers/:id", get(routes::servers::get_server))
        .route("/api/status", get(routes::status::status_page))
        .route("/api/probe", post(routes::status::probe_now))
        .route("/api/health", get(routes::health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, service).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
