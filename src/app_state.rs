use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    classify::ErrorClassifier,
    client::{AsyncJobClient, PollConfig},
    credentials::SharedCredential,
    endpoints::{EndpointError, HttpJobApi},
    registry::JobRegistry,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<AsyncJobClient>,
    pub credential: SharedCredential,
    pub registry: Arc<JobRegistry>,
    pub poll: PollConfig,
    pub video_model: Arc<str>,
}

impl AppState {
    pub fn new(
        client: AsyncJobClient,
        credential: SharedCredential,
        registry: JobRegistry,
        poll: PollConfig,
        video_model: &str,
    ) -> Self {
        Self {
            client: Arc::new(client),
            credential,
            registry: Arc::new(registry),
            poll,
            video_model: Arc::from(video_model),
        }
    }

    /// Wire the HTTP job client, shared credential and poll budget from config.
    pub fn from_config(config: &AppConfig) -> Result<Self, EndpointError> {
        let api = Arc::new(HttpJobApi::new(&config.api_base_url, config.request_timeout())?);
        let credential = SharedCredential::new(config.api_key.clone());
        let client = AsyncJobClient::new(api, Arc::new(credential.clone()))
            .with_classifier(ErrorClassifier::new(config.fatal_signatures.iter().cloned()));
        let poll = PollConfig::new(config.poll_interval(), config.max_poll_attempts);

        let registry = JobRegistry::with_retention(config.job_retention());

        Ok(Self::new(client, credential, registry, poll, &config.video_model))
    }
}
