//! Test helper utilities: a stubbed remote generation API and a live host server.

#![allow(dead_code)]

use std::time::Duration;

use reel_jobs::{app_state::AppState, config::AppConfig, models::video::VideoStatusResponse, routes};
use serde_json::{json, Value};
use tokio::time::sleep;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MODEL: &str = "video-model";
pub const SUBMIT_PATH: &str = "/v1/models/video-model:generate";

/// Base URL the job client talks to.
pub fn api_base(server: &MockServer) -> String {
    format!("{}/v1", server.uri())
}

/// Locator the remote reports for a finished operation.
pub fn artifact_uri(server: &MockServer, op: &str) -> String {
    format!("{}/files/{}.mp4?alt=media", server.uri(), op)
}

pub fn pending_operation(op: &str) -> Value {
    json!({ "name": format!("operations/{op}") })
}

pub fn running_operation(op: &str) -> Value {
    json!({
        "name": format!("operations/{op}"),
        "metadata": { "progressPercent": 40 }
    })
}

pub fn done_operation(server: &MockServer, op: &str) -> Value {
    json!({
        "name": format!("operations/{op}"),
        "done": true,
        "response": { "artifactUri": artifact_uri(server, op) }
    })
}

pub fn error_operation(op: &str, code: i64, status: &str, message: &str) -> Value {
    json!({
        "name": format!("operations/{op}"),
        "done": true,
        "error": { "code": code, "message": message, "status": status }
    })
}

/// Mount submit → `running_polls` × running → done → download for one operation.
pub async fn mount_happy_path(server: &MockServer, op: &str, running_polls: u64, body: &[u8]) {
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation(op)))
        .mount(server)
        .await;

    if running_polls > 0 {
        Mock::given(method("GET"))
            .and(path(format!("/v1/operations/{op}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(running_operation(op)))
            .up_to_n_times(running_polls)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(format!("/v1/operations/{op}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_operation(server, op)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/files/{op}.mp4")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

pub fn test_config(api_base_url: String, api_key: Option<&str>) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        api_base_url,
        api_key: api_key.map(str::to_string),
        video_model: MODEL.to_string(),
        poll_interval_ms: 5,
        max_poll_attempts: 10,
        request_timeout_secs: 5,
        job_retention_secs: 3600,
        fatal_signatures: vec![
            "Requested entity was not found".to_string(),
            "PERMISSION_DENIED".to_string(),
        ],
    }
}

/// Start the host service on an ephemeral port and return its base URL.
pub async fn spawn_app(config: &AppConfig) -> String {
    let state = AppState::from_config(config).expect("Failed to build app state");
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    format!("http://{addr}")
}

/// Poll the host until the tracked job has settled (artifact stored or error recorded).
pub async fn wait_for_settled(
    client: &reqwest::Client,
    base_url: &str,
    id: Uuid,
) -> Result<VideoStatusResponse, Box<dyn std::error::Error>> {
    for _ in 0..250 {
        let response = client
            .get(format!("{base_url}/api/v1/videos/{id}"))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {error_text}").into());
        }

        let status = response.json::<VideoStatusResponse>().await?;
        if status.artifact_ready || status.error.is_some() {
            return Ok(status);
        }
        sleep(Duration::from_millis(20)).await;
    }

    Err(format!("Video job {id} did not settle").into())
}
