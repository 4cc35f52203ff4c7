use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::video::{
    BatchAccepted, BatchEntry, BatchRequest, VideoRequest, VideoStatusResponse, VideoSubmitted,
};
use crate::routes::error::ApiError;
use crate::services::batch::{generate_all, SceneJob};
use crate::services::registry::{ArtifactLookup, RegistryObserver};

/// POST /api/v1/videos — submit one video job and poll it in the background.
pub async fn submit_video(
    State(state): State<AppState>,
    Json(request): Json<VideoRequest>,
) -> Result<(StatusCode, Json<VideoSubmitted>), ApiError> {
    request.validate()?;
    let (payload, options) = request
        .into_parts(&state.video_model)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut job = state.client.submit(&payload, &options).await?;

    let id = state.registry.register(None);
    state.registry.set_job(id, &job);

    let response = VideoSubmitted {
        id,
        remote_id: Some(job.id().to_string()),
        status: job.status(),
    };

    let registry = state.registry.clone();
    let progress_registry = registry.clone();
    let poll = state
        .poll
        .clone()
        .on_progress(move |attempt| progress_registry.record_attempt(id, attempt));
    let client = state.client.clone();

    tokio::spawn(async move {
        let result = client.await_completion(&mut job, &poll).await;
        registry.finish(id, Some(&job), &result);
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /api/v1/videos/batch — generate scene videos one after another.
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<(StatusCode, Json<BatchAccepted>), ApiError> {
    request.validate()?;

    let mut seen = HashSet::new();
    let mut scenes = Vec::with_capacity(request.scenes.len());
    for scene in request.scenes {
        if !seen.insert(scene.scene_id) {
            return Err(ApiError::BadRequest(format!(
                "duplicate scene_id {}",
                scene.scene_id
            )));
        }
        let (payload, options) = scene
            .video
            .into_parts(&state.video_model)
            .map_err(|e| ApiError::BadRequest(format!("scene {}: {e}", scene.scene_id)))?;
        scenes.push(SceneJob {
            scene_id: scene.scene_id,
            payload,
            options,
        });
    }

    let batch_id = Uuid::new_v4();
    let entries: Vec<BatchEntry> = scenes
        .iter()
        .map(|scene| BatchEntry {
            scene_id: scene.scene_id,
            id: state.registry.register(Some(scene.scene_id)),
        })
        .collect();
    let ids: HashMap<u32, Uuid> = entries.iter().map(|e| (e.scene_id, e.id)).collect();

    tracing::info!(%batch_id, scenes = scenes.len(), "Batch accepted");

    let observer = Arc::new(RegistryObserver::new(state.registry.clone(), ids));
    let client = state.client.clone();
    let poll = state.poll.clone();
    tokio::spawn(async move {
        generate_all(&client, scenes, &poll, observer).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchAccepted {
            batch_id,
            jobs: entries,
        }),
    ))
}

/// GET /api/v1/videos/{id} — tracked job status.
pub async fn get_video_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VideoStatusResponse>, ApiError> {
    state
        .registry
        .status(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("video job {id} not found")))
}

/// GET /api/v1/videos/{id}/artifact — downloaded video bytes.
pub async fn get_video_artifact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let artifact = state.registry.artifact(id).map_err(|lookup| match lookup {
        ArtifactLookup::Unknown => ApiError::NotFound(format!("video job {id} not found")),
        ArtifactLookup::NotReady => {
            ApiError::Conflict(format!("video job {id} has no artifact yet"))
        }
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.content_type_or_default())
        .header(header::CONTENT_LENGTH, artifact.len())
        .body(Body::from(artifact.bytes.clone()))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
