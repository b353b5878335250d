//! Agent side: local resource sampling and reporting to the hub
//!
//! The agent binary wires these together; everything here is usable without
//! it (the hub's integration tests drive `HubClient` directly).

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, Networks, System};
use tracing::{debug, instrument, trace};

use crate::heartbeat::{HeartbeatReport, RecordedHeartbeat};
use crate::storage::ServerRow;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One local measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_load: Option<f64>,
    pub mem_load: Option<f64>,

    /// Cumulative bytes sent over all interfaces
    pub up_bytes: i64,

    /// Cumulative bytes received over all interfaces
    pub down_bytes: i64,
}

impl ResourceSample {
    pub fn into_report(self, server_id: Option<String>, server_name: Option<String>) -> HeartbeatReport {
        HeartbeatReport {
            server_id,
            server_name,
            cpu_load: self.cpu_load,
            mem_load: self.mem_load,
            up_bytes: self.up_bytes,
            down_bytes: self.down_bytes,
        }
    }
}

fn percent(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 / total as f64 * 100.0)
}

/// Reads CPU, memory and network counters through sysinfo
pub struct MetricsCollector {
    system: System,
    networks: Networks,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Take a sample; waits one CPU update interval so usage is meaningful
    pub async fn sample(&mut self) -> ResourceSample {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.networks.refresh(true);

        let (up_bytes, down_bytes) = self
            .networks
            .list()
            .values()
            .fold((0u64, 0u64), |(up, down), data| {
                (
                    up.saturating_add(data.total_transmitted()),
                    down.saturating_add(data.total_received()),
                )
            });

        let sample = ResourceSample {
            cpu_load: Some(f64::from(self.system.global_cpu_usage())),
            mem_load: percent(self.system.used_memory(), self.system.total_memory()),
            up_bytes: i64::try_from(up_bytes).unwrap_or(i64::MAX),
            down_bytes: i64::try_from(down_bytes).unwrap_or(i64::MAX),
        };
        trace!("sampled {sample:?}");
        sample
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    server: ServerRow,
}

/// HTTP client for the hub's ingest endpoints
#[derive(Debug, Clone)]
pub struct HubClient {
    client: reqwest::Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(skip(self, report))]
    pub async fn report(&self, report: &HeartbeatReport) -> Result<RecordedHeartbeat> {
        let response = self
            .client
            .post(self.url("/api/heartbeat"))
            .json(report)
            .send()
            .await
            .context("failed to send heartbeat")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("hub rejected heartbeat ({status}): {body}");
        }

        let recorded: RecordedHeartbeat = response
            .json()
            .await
            .context("failed to parse heartbeat response")?;
        debug!("heartbeat accepted as {}", recorded.heartbeat_id);
        Ok(recorded)
    }

    #[instrument(skip(self))]
    pub async fn register(&self, name: &str) -> Result<ServerRow> {
        let response = self
            .client
            .post(self.url("/api/register"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .context("failed to send registration")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("hub rejected registration ({status}): {body}");
        }

        let registered: RegisterResponse = response
            .json()
            .await
            .context("failed to parse registration response")?;
        Ok(registered.server)
    }
}
