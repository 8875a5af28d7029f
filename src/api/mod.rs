//! HTTP/JSON + websocket surface
//!
//! One composition-root-owned `AppState` threaded through every handler via
//! axum's `State` extractor; no runtime service location. Route modules
//! mirror the endpoint table one-for-one.

pub mod auth;
mod dto;
mod error;
mod handlers;
mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::alerting::AlertEngine;
use crate::config::ConfigHandle;
use crate::dashboard::DashboardAggregator;
use crate::ingestion::IngestionPipeline;
use crate::realtime::FanOut;
use crate::retention::RetentionRunner;
use crate::store::Store;

pub use auth::AuthManager;
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub ingestion: Arc<IngestionPipeline>,
    pub alert_engine: Arc<AlertEngine>,
    pub dashboard: Arc<DashboardAggregator>,
    pub retention: Arc<RetentionRunner>,
    pub fan_out: Arc<FanOut>,
    pub config: ConfigHandle,
    pub auth: Arc<AuthManager>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
    .route("/healthz", get(handlers::health::healthz))
    .route("/api/logs", post(handlers::logs::ingest_single))
    .route("/api/logs/batch", post(handlers::logs::ingest_batch))
    .route("/api/logs/search", get(handlers::logs::search))
    .route("/api/logs/:id", get(handlers::logs::get_log))
    .route("/api/logs/:id/detail", get(handlers::logs::get_log_detail))
    .route("/api/jobs", get(handlers::jobs::list_jobs))
    .route(
        "/api/jobs/:job_id",
        get(handlers::jobs::get_job).put(handlers::jobs::upsert_job),
    )
    .route("/api/executions/start", post(handlers::executions::start))
    .route("/api/executions/:id/complete", post(handlers::executions::complete))
    .route("/api/executions/:id/cancel", post(handlers::executions::cancel))
    .route("/api/executions/:id", get(handlers::executions::get_execution))
    .route("/api/servers/heartbeat", post(handlers::servers::heartbeat))
    .route("/api/servers", get(handlers::servers::list_servers))
    .route("/api/servers/:server_name", get(handlers::servers::get_server))
    .route(
        "/api/alerts",
        get(handlers::alerts::list_alerts).post(handlers::alerts::create_alert),
    )
    .route(
        "/api/alert-instances/:id/acknowledge",
        post(handlers::alerts::acknowledge),
    )
    .route("/api/alert-instances/:id/resolve", post(handlers::alerts::resolve))
    .route(
        "/api/alert-instances/acknowledge",
        post(handlers::alerts::acknowledge_bulk),
    )
    .route("/api/alert-instances/resolve", post(handlers::alerts::resolve_bulk))
    .route("/api/alert-instances", get(handlers::alerts::list_instances))
    .route("/api/dashboard/summary", get(handlers::dashboard::summary))
    .route("/api/maintenance/retention", post(handlers::maintenance::run_retention))
    .route("/ws", get(ws::upgrade))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
