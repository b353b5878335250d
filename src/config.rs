use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::actors::MIN_PROBE_INTERVAL;
use crate::prober::{DEFAULT_CONCURRENCY, ProbeSettings};

/// Overrides the SQLite database path
pub const DB_PATH_ENV: &str = "DB_PATH";

/// Overrides the port of the API bind address
pub const PORT_ENV: &str = "PORT";

const DEFAULT_BIND: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8000);

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default)
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./data/status.db")
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            enable_cors: true,
        }
    }
}

fn default_bind() -> SocketAddr {
    DEFAULT_BIND
}

fn default_true() -> bool {
    true
}

/// Probe cadence and fan-out; durations in seconds
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ProberConfig {
    #[serde(default = "default_interval")]
    pub interval: u64,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

impl ProberConfig {
    /// Never shorter than one second
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval).max(MIN_PROBE_INTERVAL)
    }

    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_secs(self.timeout),
            concurrency: self.concurrency,
        }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    2
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_worker_id() -> u16 {
    1
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub prober: ProberConfig,

    /// Worker id embedded in every generated identifier (0..=1023)
    #[serde(default = "default_worker_id")]
    pub worker_id: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            api: ApiSettings::default(),
            prober: ProberConfig::default(),
            worker_id: default_worker_id(),
        }
    }
}

impl Config {
    /// Apply `DB_PATH` and `PORT` from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DB_PATH_ENV)
            && let StorageConfig::Sqlite { path: current } = &mut self.storage
        {
            *current = PathBuf::from(path);
        }

        if let Some(port) = lookup(PORT_ENV).and_then(|p| p.parse().ok()) {
            self.api.bind.set_port(port);
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
