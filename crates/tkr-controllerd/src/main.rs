use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tkr_core::{
    cluster::{Fixtures, InMemoryCluster},
    reconciler::{ReconcilerContext, TaskRunReconciler},
};
use tkr_observe::{LoggerFormat, LoggerLevel, init_logger};
use tkr_prometheus::PrometheusMetrics;

mod config;
mod http;
mod resync;

use config::DaemonConfig;

/// TaskRun controller daemon backed by an in-memory cluster.
#[derive(Parser)]
#[command(name = "tkr-controllerd", version)]
struct Cli {
    /// Daemon config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Objects to seed the in-memory cluster with (JSON)
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Override the metrics listen address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Override the resync interval in seconds
    #[arg(long)]
    resync: Option<u64>,

    /// Override the log filter (e.g. "tkr_core=debug,info")
    #[arg(long)]
    log_level: Option<LoggerLevel>,

    /// Override the log format: text, json or journald
    #[arg(long)]
    log_format: Option<LoggerFormat>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) config + logger
    let mut cfg = match &cli.config {
        Some(path) => DaemonConfig::from_file(path)?,
        None => DaemonConfig::default(),
    };
    cfg.logger = cfg.logger.with_env_overrides()?;
    if let Some(level) = cli.log_level {
        cfg.logger.level = level;
    }
    if let Some(format) = cli.log_format {
        cfg.logger.format = format;
    }
    if let Some(addr) = cli.metrics_addr {
        cfg.metrics_addr = addr;
    }
    if let Some(secs) = cli.resync {
        cfg.resync_interval = Duration::from_secs(secs).into();
    }
    init_logger(&cfg.logger)?;
    info!(
        default_timeout = %cfg.controller.default_timeout,
        resync = %cfg.resync_interval,
        "logger initialized"
    );

    // 2) cluster
    let fixtures = match &cli.fixtures {
        Some(path) => Fixtures::from_file(path)?,
        None => Fixtures::default(),
    };
    let cluster = Arc::new(InMemoryCluster::from_fixtures(fixtures).with_action_log_capacity(0));
    info!(runs = cluster.task_run_keys().await.len(), "cluster seeded");

    // 3) reconciler + metrics
    let metrics = PrometheusMetrics::new()?;
    let ctx = ReconcilerContext::new(cfg.controller.clone()).with_metrics(Arc::new(metrics.clone()));
    info!(%ctx, "reconciler ready");
    let reconciler = Arc::new(TaskRunReconciler::new(cluster.clone(), ctx));

    let token = CancellationToken::new();

    // 4) metrics server
    let listener = TcpListener::bind(cfg.metrics_addr).await?;
    info!(addr = %cfg.metrics_addr, "serving /metrics and /healthz");
    let server_token = token.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, http::router(metrics))
            .with_graceful_shutdown(server_token.cancelled_owned())
            .await
    });

    // 5) resync loop
    let resync = tokio::spawn(resync::run(
        reconciler,
        cluster,
        cfg.resync_period(),
        token.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    token.cancel();

    resync.await?;
    if let Err(e) = server.await? {
        error!(error = %e, "metrics server error");
    }
    Ok(())
}
