use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use reel_jobs::{app_state::AppState, config::AppConfig, routes};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        api_base_url = %config.api_base_url,
        model = %config.video_model,
        poll_interval_ms = config.poll_interval_ms,
        max_poll_attempts = config.max_poll_attempts,
        "Initializing reel-jobs server"
    );

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "generation_jobs_submitted_total",
        "Generation jobs accepted by the remote API"
    );
    metrics::describe_counter!(
        "generation_jobs_succeeded_total",
        "Generation jobs whose artifact was downloaded"
    );
    metrics::describe_counter!(
        "generation_jobs_failed_total",
        "Generation jobs that ended without an artifact, by reason"
    );
    metrics::describe_counter!("generation_job_polls_total", "Status polls issued");
    metrics::describe_histogram!(
        "generation_job_duration_seconds",
        "Time from the first poll to a terminal outcome"
    );

    let state = AppState::from_config(&config).expect("Failed to initialize generation API client");
    if !state.credential.is_present() {
        tracing::warn!("No API key configured; set one with PUT /api/v1/credential");
    }

    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            axum::routing::get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(25 * 1024 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
