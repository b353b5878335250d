use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use fleet_monitor::agent::{HubClient, MetricsCollector};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Base URL of the hub, e.g. http://hub.internal:8000
    #[arg(long, env = "SERVER_URL")]
    server_url: String,

    /// Server id issued by the hub
    #[arg(long, env = "SERVER_ID")]
    server_id: Option<String>,

    /// Server name; registers on first report when no id is given
    #[arg(long, env = "SERVER_NAME")]
    server_name: Option<String>,

    /// Seconds between reports
    #[arg(long, default_value_t = 60)]
    interval: u64,

    /// Report once and exit
    #[arg(long)]
    once: bool,

    /// Register --server-name with the hub, print the id and exit
    #[arg(long)]
    register: bool,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("fleet_monitor", LevelFilter::DEBUG),
        ("fleet_agent", LevelFilter::TRACE),
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

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let client = HubClient::new(&args.server_url)?;

    if args.register {
        let Some(name) = args.server_name.as_deref() else {
            anyhow::bail!("--register requires --server-name");
        };
        let server = client.register(name).await?;
        println!("{}", server.id);
        return Ok(ExitCode::SUCCESS);
    }

    if args.server_id.is_none() && args.server_name.is_none() {
        anyhow::bail!("either --server-id or --server-name is required");
    }

    let mut collector = MetricsCollector::new();

    loop {
        let report = collector
            .sample()
            .await
            .into_report(args.server_id.clone(), args.server_name.clone());

        let outcome = client.report(&report).await;
        match &outcome {
            Ok(recorded) => info!("reported as server {}", recorded.server_id),
            Err(e) => error!("report failed: {e:#}"),
        }

        if args.once {
            return Ok(if outcome.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }

        tokio::time::sleep(Duration::from_secs(args.interval)).await;
    }
}
