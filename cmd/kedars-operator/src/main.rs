use clap::Parser;
use pkg_constants::paths::{DEFAULT_METRICS_PORT, DEFAULT_OPERATOR_CONFIG, DEFAULT_OPERATOR_DATA_DIR};
use pkg_constants::scaling::{DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_SCALER_TIMEOUT_SECS};
use pkg_controllers::{ScaledObjectController, ScalingContext, StoreResourceManager};
use pkg_metrics::ScalingMetrics;
use pkg_scalers::ScalerRegistry;
use pkg_state::client::StateStore;
use pkg_types::config::{OperatorConfigFile, load_config_file};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser, Debug)]
#[command(name = "kedars-operator", about = "kedars event-driven autoscaling operator")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_OPERATOR_CONFIG)]
    config: String,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Port for the /metrics and /healthz endpoints
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Seconds between scans for new, changed or deleted ScaledObjects
    #[arg(long)]
    resync_interval: Option<u64>,

    /// Upper bound in seconds on one scaler query
    #[arg(long)]
    scaler_timeout: Option<u64>,

    /// Log output format: text or json
    #[arg(long)]
    log_format: Option<String>,
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: OperatorConfigFile = load_config_file(&cli.config)?;

    // Merge: CLI args > config file > defaults
    let log_format = cli
        .log_format
        .or(file_cfg.log_format)
        .unwrap_or_else(|| "text".to_string());
    init_tracing(&log_format);
    info!("Config file: {}", cli.config);

    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| DEFAULT_OPERATOR_DATA_DIR.to_string());
    let metrics_port = cli
        .metrics_port
        .or(file_cfg.metrics_port)
        .unwrap_or(DEFAULT_METRICS_PORT);
    let resync_interval = cli
        .resync_interval
        .or(file_cfg.resync_interval)
        .unwrap_or(DEFAULT_RESYNC_INTERVAL_SECS)
        .max(1);
    let scaler_timeout = cli
        .scaler_timeout
        .or(file_cfg.scaler_timeout)
        .unwrap_or(DEFAULT_SCALER_TIMEOUT_SECS)
        .max(1);

    info!("Starting kedars-operator");
    info!("  Data dir:        {}", data_dir);
    info!("  Metrics port:    {}", metrics_port);
    info!("  Resync interval: {}s", resync_interval);
    info!("  Scaler timeout:  {}s", scaler_timeout);

    let store = StateStore::new(&data_dir).await?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(scaler_timeout))
        .build()?;
    let registry = ScalerRegistry::with_builtins(store.clone(), http);
    info!("  Trigger types:   {}", registry.trigger_types().join(", "));

    let metrics = ScalingMetrics::default();
    let ctx = ScalingContext {
        resources: Arc::new(StoreResourceManager::new(store.clone())),
        registry,
        metrics: metrics.clone(),
        scaler_timeout: Duration::from_secs(scaler_timeout),
    };

    let shutdown = CancellationToken::new();
    let controller = ScaledObjectController::new(
        store.clone(),
        ctx,
        Duration::from_secs(resync_interval),
    )
    .start(shutdown.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
    let http_server = tokio::spawn(server::serve(addr, metrics, shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    if let Err(e) = controller.await {
        warn!("ScaledObjectController task failed: {}", e);
    }
    match http_server.await {
        Ok(Err(e)) => warn!("Metrics server error: {}", e),
        Err(e) => warn!("Metrics server task failed: {}", e),
        Ok(Ok(())) => {}
    }
    store.close().await?;
    info!("kedars-operator stopped");
    Ok(())
}
