use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;

pub mod credential;
pub mod error;
pub mod health;
pub mod metrics;
pub mod videos;

/// Seed images travel inline as base64, so requests can be large.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// API routes. The Prometheus endpoint is attached separately in `main`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/videos", post(videos::submit_video))
        .route("/api/v1/videos/batch", post(videos::submit_batch))
        .route("/api/v1/videos/{id}", get(videos::get_video_status))
        .route("/api/v1/videos/{id}/artifact", get(videos::get_video_artifact))
        .route("/api/v1/credential", put(credential::rotate_credential))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
