use axum::extract::State;
use axum::Json;

use crate::api::auth::{AuthContext, Capability};
use crate::api::dto::RunRetentionRequest;
use crate::api::{ApiResult, AppState};
use crate::retention::RetentionReport;

/// `POST /api/maintenance/retention` ("RunRetention").
pub async fn run_retention(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Option<Json<RunRetentionRequest>>,
) -> ApiResult<Json<RetentionReport>> {
    auth.require(Capability::RunRetention)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let report = state.retention.run(&state.config, req.dry_run, req.batch_size).await;
    Ok(Json(report))
}
