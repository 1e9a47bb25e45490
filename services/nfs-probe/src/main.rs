//! NFS read probe service.
//!
//! Repeatedly reads a file on an NFS mount and reports per-second read
//! latency statistics over HTTP:
//! - Start/stop the read workload on demand
//! - Rolling one-second average/min/max latency and read rate
//! - Static file serving from the mount
//! - Prometheus metrics

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use read_meter::Pipeline;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nfs_probe::config::ProbeConfig;
use nfs_probe::server::{self, ServerState};

#[derive(Parser, Debug)]
#[command(name = "nfs-probe")]
#[command(about = "HTTP-controlled read-latency probe for NFS mounts")]
struct Args {
    /// Port for the HTTP server
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Target file, relative to the NFS mount
    #[arg(long, env = "FILENAME")]
    filename: String,

    /// NFS mount directory (default: first volume mount in VCAP_SERVICES)
    #[arg(long, env = "NFS_DIR")]
    nfs_dir: Option<PathBuf>,

    /// Service binding JSON used to discover the NFS mount
    #[arg(long, env = "VCAP_SERVICES", hide_env_values = true)]
    vcap_services: Option<String>,

    /// Capacity of the sample channel between workload and aggregator
    #[arg(long, default_value_t = read_meter::DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting NFS probe");

    let config = ProbeConfig::resolve(
        args.nfs_dir,
        args.vcap_services.as_deref(),
        args.filename,
        args.port,
    )?;

    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics exporter initialized");

    let target = config.target_path();
    info!(path = %target.display(), "Probe target configured");

    let state = Arc::new(ServerState {
        pipeline: Pipeline::spawn_with_capacity(target, args.channel_capacity),
        image_dir: config.image_dir(),
        prometheus: Some(prometheus),
    });

    server::run_server(state, config.port).await
}
