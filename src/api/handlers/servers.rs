use axum::extract::{Path, Query, State};
use axum::Json;

use crate::api::auth::{AuthContext, Capability};
use crate::api::dto::ActiveOnlyQuery;
use crate::api::{ApiError, ApiResult, AppState};
use crate::model::Server;
use crate::store::HeartbeatFields;

/// `POST /api/servers/heartbeat`
pub async fn heartbeat(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(fields): Json<HeartbeatFields>,
) -> ApiResult<Json<Server>> {
    auth.require(Capability::Heartbeat)?;
    Ok(Json(state.store.process_heartbeat(fields).await))
}

/// `GET /api/servers?activeOnly=`.
pub async fn list_servers(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ActiveOnlyQuery>,
) -> ApiResult<Json<Vec<Server>>> {
    auth.require(Capability::ReadOnly)?;
    Ok(Json(state.store.list_servers(query.active_only).await))
}

/// `GET /api/servers/:server_name`.
pub async fn get_server(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(server_name): Path<String>,
) -> ApiResult<Json<Server>> {
    auth.require(Capability::ReadOnly)?;
    state
    .store
    .get_server(&server_name)
    .await
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("Server '{server_name}' not found")))
}
