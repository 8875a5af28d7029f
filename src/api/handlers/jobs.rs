use axum::extract::{Path, Query, State};
use axum::Json;

use crate::api::auth::{AuthContext, Capability};
use crate::api::dto::ActiveOnlyQuery;
use crate::api::{ApiError, ApiResult, AppState};
use crate::model::Job;
use crate::store::UpsertJobFields;

/// `GET /api/jobs?activeOnly=`.
pub async fn list_jobs(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ActiveOnlyQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    auth.require(Capability::ReadOnly)?;
    Ok(Json(state.store.list_jobs(query.active_only).await))
}

/// `GET /api/jobs/:job_id`.
pub async fn get_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    auth.require(Capability::ReadOnly)?;
    state
    .store
    .get_job(&job_id)
    .await
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("Job '{job_id}' not found")))
}

/// `PUT /api/jobs/:job_id` (`UpsertJob`: autovivifies on an
/// unknown id).
pub async fn upsert_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(job_id): Path<String>,
    Json(fields): Json<UpsertJobFields>,
) -> ApiResult<Json<Job>> {
    auth.require(Capability::RegisterJob)?;
    let actor = auth.actor_label();
    Ok(Json(state.store.upsert_job(&job_id, fields, Some(&actor)).await))
}
