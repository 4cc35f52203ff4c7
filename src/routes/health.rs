use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub credential: String,
    pub tracked_jobs: usize,
}

/// GET /health — liveness plus whether an API key is loaded.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let credential = if state.credential.is_present() {
        "present"
    } else {
        "missing"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credential: credential.to_string(),
        tracked_jobs: state.registry.len(),
    })
}
