use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::auth::{AuthContext, Capability};
use crate::api::{ApiError, ApiResult, AppState};
use crate::model::JobExecution;
use crate::store::{CompleteExecutionRequest, StartExecutionRequest, StartedExecution};

/// `POST /api/executions/start`
pub async fn start(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<StartExecutionRequest>,
) -> ApiResult<Json<StartedExecution>> {
    auth.require(Capability::StartExecution)?;
    let started = state.store.start_execution(req).await?;
    Ok(Json(started))
}

#[derive(Debug, Deserialize)]
pub struct CompleteExecutionBody {
    pub status: crate::model::ExecutionStatus,
    pub result_summary: Option<serde_json::Value>,
    pub result_code: Option<i32>,
    pub error_message: Option<String>,
    pub error_category: Option<String>,
}

/// `POST /api/executions/:id/complete`
pub async fn complete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(execution_id): Path<u64>,
    Json(body): Json<CompleteExecutionBody>,
) -> ApiResult<Json<JobExecution>> {
    auth.require(Capability::StartExecution)?;
    let execution = state
    .store
    .complete_execution(CompleteExecutionRequest {
        execution_id,
        status: body.status,
        result_summary: body.result_summary,
        result_code: body.result_code,
        error_message: body.error_message,
        error_category: body.error_category,
    })
    .await?;
    Ok(Json(execution))
}

#[derive(Debug, Deserialize)]
pub struct CancelExecutionBody {
    pub reason: Option<String>,
}

/// `POST /api/executions/:id/cancel` Body is optional since
/// `reason` itself is optional.
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(execution_id): Path<u64>,
    body: Option<Json<CancelExecutionBody>>,
) -> ApiResult<Json<JobExecution>> {
    auth.require(Capability::CancelExecution)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let execution = state.store.cancel_execution(execution_id, reason).await?;
    Ok(Json(execution))
}

/// `GET /api/executions/:id`.
pub async fn get_execution(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(execution_id): Path<u64>,
) -> ApiResult<Json<JobExecution>> {
    auth.require(Capability::ReadOnly)?;
    state
    .store
    .get_execution(execution_id)
    .await
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("JobExecution '{execution_id}' not found")))
}
