use axum::extract::State;
use axum::Json;

use crate::api::auth::{AuthContext, Capability};
use crate::api::{ApiResult, AppState};
use crate::dashboard::DashboardSummary;

/// `GET /api/dashboard/summary`
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DashboardSummary>> {
    auth.require(Capability::ReadOnly)?;
    Ok(Json(state.dashboard.get_summary().await))
}
