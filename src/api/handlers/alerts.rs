use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::auth::{AuthContext, Capability};
use crate::api::dto::{AlertInstanceActionFailure, AlertInstanceActionRequest, AlertInstanceActionResult, AlertInstanceQuery};
use crate::api::{ApiResult, AppState};
use crate::model::{Alert, AlertInstance};
use crate::store::CreateAlertFields;

/// `POST /api/alerts` ("CreateAlert").
pub async fn create_alert(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(fields): Json<CreateAlertFields>,
) -> ApiResult<Json<Alert>> {
    auth.require(Capability::Admin)?;
    Ok(Json(state.store.create_alert(fields).await))
}

/// `GET /api/alerts`.
pub async fn list_alerts(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Alert>>> {
    auth.require(Capability::ReadOnly)?;
    Ok(Json(state.store.list_alerts().await))
}

#[derive(Debug, Deserialize)]
pub struct AlertInstanceNoteBody {
    pub note: Option<String>,
}

/// `POST /api/alert-instances/:id/acknowledge` (lifecycle).
pub async fn acknowledge(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
    body: Option<Json<AlertInstanceNoteBody>>,
) -> ApiResult<Json<AlertInstance>> {
    auth.require(Capability::AcknowledgeAlert)?;
    let actor = auth.actor_label();
    let note = body.and_then(|Json(b)| b.note);
    let instance = state.store.acknowledge_instance(id, &actor, note).await?;
    Ok(Json(instance))
}

/// `POST /api/alert-instances/:id/resolve` (lifecycle).
pub async fn resolve(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
    body: Option<Json<AlertInstanceNoteBody>>,
) -> ApiResult<Json<AlertInstance>> {
    auth.require(Capability::ResolveAlert)?;
    let actor = auth.actor_label();
    let note = body.and_then(|Json(b)| b.note);
    let instance = state.store.resolve_instance(id, &actor, note).await?;
    Ok(Json(instance))
}

/// `GET /api/alert-instances?alertId=`.
pub async fn list_instances(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<AlertInstanceQuery>,
) -> ApiResult<Json<Vec<AlertInstance>>> {
    auth.require(Capability::ReadOnly)?;
    Ok(Json(state.store.list_alert_instances(query.alert_id).await))
}

/// `POST /api/alert-instances/acknowledge` ("bulk variants are
/// allowed; each instance is transitioned independently and atomically").
pub async fn acknowledge_bulk(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<AlertInstanceActionRequest>,
) -> ApiResult<Json<AlertInstanceActionResult>> {
    auth.require(Capability::AcknowledgeAlert)?;
    let actor = auth.actor_label();
    Ok(Json(
            run_bulk(&body.instance_ids, |id| {
                    state.store.acknowledge_instance(id, &actor, body.note.clone())
            })
            .await,
    ))
}

/// `POST /api/alert-instances/resolve`, the bulk counterpart of `resolve`.
pub async fn resolve_bulk(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<AlertInstanceActionRequest>,
) -> ApiResult<Json<AlertInstanceActionResult>> {
    auth.require(Capability::ResolveAlert)?;
    let actor = auth.actor_label();
    Ok(Json(
            run_bulk(&body.instance_ids, |id| {
                    state.store.resolve_instance(id, &actor, body.note.clone())
            })
            .await,
    ))
}

async fn run_bulk<F, Fut>(instance_ids: &[u64], action: F) -> AlertInstanceActionResult
where
F: Fn(u64) -> Fut,
Fut: std::future::Future<Output = crate::error::Result<AlertInstance>>,
{
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for &id in instance_ids {
        match action(id).await {
            Ok(instance) => succeeded.push(instance),
            Err(err) => failed.push(AlertInstanceActionFailure {
                instance_id: id,
                error: err.to_string(),
            }),
        }
    }
    AlertInstanceActionResult { succeeded, failed }
}
