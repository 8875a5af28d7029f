//! Composition root: wires every component into the running process and
//! serves `AppConfig.bind_addr` until an operator interrupts it.
//!
//! A `clap` CLI with no subcommands (one process mode), `dotenvy` +
//! `tracing-subscriber` bring-up, then `axum::serve` with graceful shutdown
//! on Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use log_nexus::alerting::AlertEngine;
use log_nexus::api::{self, AppState, AuthManager};
use log_nexus::clock::SystemClock;
use log_nexus::config::{AppConfig, ConfigHandle};
use log_nexus::dashboard::DashboardAggregator;
use log_nexus::execution::ExecutionTimeoutSweeper;
use log_nexus::heartbeat::HeartbeatSweeper;
use log_nexus::ingestion::IngestionPipeline;
use log_nexus::notify::LoggingNotificationDispatcher;
use log_nexus::realtime::FanOut;
use log_nexus::retention::RetentionRunner;
use log_nexus::store::Store;

#[derive(Parser, Debug)]
#[command(name = "log-nexus-server")]
#[command(about = "Log Nexus ingestion, alerting and dashboard service", long_about = None)]
struct Cli {
    /// Override `BIND_ADDR` for this run.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Pre-register one HMAC-signed API key as `name=rawkey` (repeatable).
    /// Convenience for local smoke testing; production key issuance is an
    /// external collaborator ("Out of scope").
    #[arg(long = "api-key", value_name = "NAME=KEY")]
    api_keys: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(addr) = cli.bind_addr {
        config.bind_addr = addr;
    }
    let config = ConfigHandle::new(config);

    let clock = Arc::new(SystemClock);
    let store = Store::new(clock);
    let fan_out = Arc::new(FanOut::default());
    let auth = Arc::new(AuthManager::new(hmac_secret()));

    for entry in &cli.api_keys {
        let Some((name, key)) = entry.split_once('=') else {
            tracing::warn!(entry = %entry, "ignoring malformed --api-key (expected NAME=KEY)");
            continue;
        };
        auth.register_api_key(key, name, vec!["logs:write".into(), "heartbeat:write".into(), "jobs:write".into()]);
        tracing::info!(name, "registered API key");
    }

    let ingestion = IngestionPipeline::new(store.clone(), Arc::new(SystemClock), config.clone(), fan_out.clone());
    let dashboard = DashboardAggregator::new(store.clone(), config.clone(), fan_out.clone());
    let heartbeat = HeartbeatSweeper::new(store.clone(), fan_out.clone());
    let execution_sweeper = ExecutionTimeoutSweeper::new(store.clone(), fan_out.clone());
    let retention = RetentionRunner::new(store.clone(), dashboard.clone(), heartbeat.clone());
    let alert_engine = AlertEngine::new(store.clone(), fan_out.clone(), Arc::new(LoggingNotificationDispatcher));

    let state = AppState {
        store: store.clone(),
        ingestion: ingestion.clone(),
        alert_engine: alert_engine.clone(),
        dashboard: dashboard.clone(),
        retention: retention.clone(),
        fan_out: fan_out.clone(),
        config: config.clone(),
        auth,
    };

    let flush_worker = ingestion.spawn_flush_worker();
    let alert_task = alert_engine.spawn(&config);
    let heartbeat_task = heartbeat.spawn(&config);
    let execution_task = execution_sweeper.spawn(&config);
    let dashboard_task = dashboard.spawn();
    let retention_task = retention.spawn(config.clone());

    let app = api::build_router(state);
    let addr: SocketAddr = config
    .current()
    .bind_addr
    .parse()
    .context("BIND_ADDR is not a valid socket address")?;
    let listener = tokio::net::TcpListener::bind(addr)
    .await
    .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!(%addr, "log-nexus listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("shutting down background tasks");
    flush_worker.stop().await;
    alert_task.stop().await;
    heartbeat_task.stop().await;
    execution_task.stop().await;
    dashboard_task.stop().await;
    retention_task.stop().await;

    Ok(())
}

fn hmac_secret() -> Vec<u8> {
    std::env::var("AUTH_HMAC_SECRET")
    .unwrap_or_else(|_| "log-nexus-dev-secret".to_string())
    .into_bytes()
}

fn init_tracing() {
    tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer())
    .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "unable to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
