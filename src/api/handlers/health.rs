use axum::extract::State;
use axum::Json;

use crate::api::dto::HealthResponse;
use crate::api::AppState;

/// `GET /healthz`: liveness/readiness probe, exempt from auth.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        time: state.store.now(),
    })
}
