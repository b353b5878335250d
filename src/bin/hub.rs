use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fleet_monitor::{
    actors::ProberHandle,
    api::{ApiConfig, ApiState, spawn_api_server},
    clock::{Clock, SystemClock},
    config::{Config, StorageConfig, read_config_file},
    id::IdGenerator,
    prober::{ReachabilityProber, SystemPinger},
    storage::{MemoryBackend, StorageBackend, sqlite::SqliteBackend},
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults apply when omitted)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("fleet_monitor", LevelFilter::DEBUG),
        ("fleet_hub", LevelFilter::TRACE),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

async fn open_storage(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    Ok(match config {
        StorageConfig::None => {
            warn!("using in-memory storage, history is lost on restart");
            Arc::new(MemoryBackend::new())
        }
        StorageConfig::Sqlite { path } => Arc::new(
            SqliteBackend::new(path)
                .await
                .with_context(|| format!("failed to open database at {}", path.display()))?,
        ),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };
    config.apply_env_overrides();

    let storage = open_storage(&config.storage).await?;
    info!("{}", storage.get_stats().await?);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids = Arc::new(
        IdGenerator::with_clock(config.worker_id, clock.clone())
            .context("invalid worker_id in config")?,
    );

    let settings = config.prober.settings();
    let prober = Arc::new(ReachabilityProber::new(
        storage.clone(),
        ids.clone(),
        clock.clone(),
        Arc::new(SystemPinger::new(settings.timeout)),
        settings,
    ));
    let prober = ProberHandle::spawn(prober, config.prober.interval());

    let state = ApiState::new(storage.clone(), ids, clock).with_prober(prober.clone());
    spawn_api_server(ApiConfig::from(&config.api), state).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    prober.shutdown().await;
    storage.close().await?;

    Ok(())
}
