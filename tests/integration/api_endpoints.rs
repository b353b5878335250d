//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Agents can report and register over HTTP
//! - The source address comes from forwarding headers or the peer
//! - Read endpoints return the documents dashboards consume
//! - Errors map to the right status codes

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fleet_monitor::{
    actors::ProberHandle,
    agent::HubClient,
    api::{ApiConfig, ApiState, spawn_api_server},
    clock::ManualClock,
    heartbeat::HeartbeatReport,
    id::IdGenerator,
    prober::{ProbeSettings, ReachabilityProber},
    storage::{MemoryBackend, StorageBackend},
};
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::*;

struct TestHub {
    addr: SocketAddr,
    clock: Arc<ManualClock>,
    client: reqwest::Client,
}

impl TestHub {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

// Helper to create test API server
async fn spawn_test_api(with_prober: bool) -> TestHub {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::from_secs(T0_SECS));
    let ids = Arc::new(IdGenerator::with_clock(4, clock.clone()).unwrap());

    let mut state = ApiState::new(storage.clone(), ids.clone(), clock.clone());
    if with_prober {
        let prober = ReachabilityProber::new(
            storage,
            ids,
            clock.clone(),
            Arc::new(TablePinger::up(&["203.0.113.7"])),
            ProbeSettings::default(),
        );
        state = state.with_prober(ProberHandle::spawn(
            Arc::new(prober),
            Duration::from_secs(3600),
        ));
    }

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    let addr = spawn_api_server(config, state).await.unwrap();
    TestHub {
        addr,
        clock,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_heartbeat_uses_forwarded_address() {
    let hub = spawn_test_api(false).await;

    let response = hub
        .client
        .post(hub.url("/api/heartbeat"))
        .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .json(&json!({"server_name": "edge", "cpu_load": 3.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["server_id"].is_string());
    assert!(body["heartbeat_id"].is_string());

    let (status, servers) = hub.get("/api/servers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(servers["servers"][0]["name"], "edge");
    assert_eq!(servers["servers"][0]["address"], "203.0.113.7");
}

#[tokio::test]
async fn test_heartbeat_falls_back_to_peer_address() {
    let hub = spawn_test_api(false).await;
    let client = HubClient::new(hub.url("")).unwrap();

    let recorded = client
        .report(&HeartbeatReport {
            server_name: Some("local".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let (status, detail) = hub.get(&format!("/api/servers/{}", recorded.server_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["server"]["address"], "127.0.0.1");
    assert_eq!(detail["heartbeat_data"][0]["address"], "127.0.0.1");
    assert!(detail["heartbeat_data"][0].get("raw").is_none());
}

#[tokio::test]
async fn test_register_is_idempotent() {
    let hub = spawn_test_api(false).await;
    let client = HubClient::new(hub.url("")).unwrap();

    let first = client.register("db-1").await.unwrap();
    let second = client.register("db-1").await.unwrap();

    assert_eq!(first.id, second.id);

    let report = HeartbeatReport {
        server_id: Some(first.id.to_string()),
        ..Default::default()
    };
    let recorded = client.report(&report).await.unwrap();
    assert_eq!(recorded.server_id, first.id);
}

#[tokio::test]
async fn test_error_status_codes() {
    let hub = spawn_test_api(false).await;

    let anonymous = hub
        .client
        .post(hub.url("/api/heartbeat"))
        .json(&json!({"cpu_load": 1.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::BAD_REQUEST);
    let body: Value = anonymous.json().await.unwrap();
    assert!(body["error"].is_string());

    let unknown_id = hub
        .client
        .post(hub.url("/api/heartbeat"))
        .json(&json!({"server_id": "123456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_id.status(), StatusCode::NOT_FOUND);

    let (status, _) = hub.get("/api/servers/123456").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = hub.get("/api/servers/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let probe = hub.client.post(hub.url("/api/probe")).send().await.unwrap();
    assert_eq!(probe.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_status_page_document() {
    let hub = spawn_test_api(true).await;

    hub.client
        .post(hub.url("/api/heartbeat"))
        .header("X-Real-IP", "203.0.113.7")
        .json(&json!({"server_name": "edge", "cpu_load": 20.0, "mem_load": 40.0}))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();

    hub.clock.advance_millis(1_000);
    let probe = hub.client.post(hub.url("/api/probe")).send().await.unwrap();
    assert_eq!(probe.status(), StatusCode::OK);
    let probe: Value = probe.json().await.unwrap();
    assert_eq!(probe["report"]["reachable"], 1);

    hub.clock.advance_millis(1_000);
    let (status, page) = hub.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["overall_status"], "ok");

    let server = &page["servers"][0];
    assert_eq!(server["name"], "edge");
    assert_eq!(server["reachability"], "ok");
    assert_eq!(server["reporting"], "ok");
    assert_eq!(server["timeline"].as_array().unwrap().len(), 288);
    assert_eq!(server["timeline"][287]["ping"], 1);
    assert_eq!(server["timeline"][287]["heartbeat"], 1);
    assert_eq!(server["resource_series"].as_array().unwrap().len(), 60);
    assert_eq!(server["current"]["cpu"], 20.0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let hub = spawn_test_api(false).await;

    let (status, body) = hub.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"]["healthy"], true);
    assert!(body["storage"]["stats"].as_str().unwrap().contains("0 servers"));
}
