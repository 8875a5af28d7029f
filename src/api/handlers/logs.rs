use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::auth::{AuthContext, Capability};
use crate::api::dto::{LogSearchQuery, LogSearchResponse};
use crate::api::{ApiError, ApiResult, AppState};
use crate::ingestion::CreateLogRequest;
use crate::model::LogEntry;

fn client_ip(addr: Option<ConnectInfo<SocketAddr>>) -> Option<String> {
    addr.map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// `POST /api/logs` (single ingest).
pub async fn ingest_single(
    State(state): State<AppState>,
    auth: AuthContext,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<CreateLogRequest>,
) -> ApiResult<Json<crate::ingestion::LogIngestionResult>> {
    auth.require(Capability::IngestLog)?;
    let result = state.ingestion.ingest_single(req, client_ip(addr)).await?;
    Ok(Json(result))
}

/// `POST /api/logs/batch` (batch ingest).
pub async fn ingest_batch(
    State(state): State<AppState>,
    auth: AuthContext,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(reqs): Json<Vec<CreateLogRequest>>,
) -> ApiResult<Json<crate::ingestion::BatchLogResult>> {
    auth.require(Capability::IngestLog)?;
    let result = state.ingestion.ingest_batch(reqs, client_ip(addr)).await;
    Ok(Json(result))
}

/// `GET /api/logs/search`
pub async fn search(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<LogSearchQuery>,
) -> ApiResult<Json<LogSearchResponse>> {
    auth.require(Capability::ReadOnly)?;
    let filter: crate::store::LogSearchFilter = query.into();
    let page = state.store.search_logs(&filter).await;
    Ok(Json(LogSearchResponse {
            items: page.items,
            total_count: page.total_count,
            page: filter.page,
            page_size: filter.page_size,
    }))
}

/// `GET /api/logs/:id`.
pub async fn get_log(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> ApiResult<Json<LogEntry>> {
    auth.require(Capability::ReadOnly)?;
    state
    .store
    .get_log(id)
    .await
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("LogEntry '{id}' not found")))
}

#[derive(Debug, Serialize)]
pub struct LogDetailResponse {
    pub entry: LogEntry,
    pub correlated: Vec<LogEntry>,
}

/// `GET /api/logs/:id/detail` ("GetLogDetail... + correlated
/// siblings"): the entry plus every other log sharing its correlationId.
pub async fn get_log_detail(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> ApiResult<Json<LogDetailResponse>> {
    auth.require(Capability::ReadOnly)?;
    let entry = state
    .store
    .get_log(id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("LogEntry '{id}' not found")))?;

    let correlated = match &entry.correlation_id {
        Some(correlation_id) => state
        .store
        .logs_by_correlation(correlation_id)
        .await
        .into_iter()
        .filter(|e| e.id != id)
        .collect(),
        None => Vec::new(),
    };

    Ok(Json(LogDetailResponse { entry, correlated }))
}
