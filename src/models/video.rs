use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::models::request::{GenerationRequest, RequestError, SeedImage, SubmitOptions};

/// Request to generate one video clip.
#[derive(Debug, Deserialize, Validate)]
pub struct VideoRequest {
    #[garde(length(min = 1, max = 4000))]
    pub prompt: String,

    #[garde(length(min = 1, max = 10))]
    pub aspect_ratio: Option<String>,

    #[garde(length(min = 1, max = 10))]
    pub resolution: Option<String>,

    /// Seed image as a base64 data URL.
    #[garde(skip)]
    pub seed_image: Option<String>,
}

impl VideoRequest {
    /// Split into the job payload and submission options.
    pub fn into_parts(
        self,
        model: &str,
    ) -> Result<(GenerationRequest, SubmitOptions), RequestError> {
        let options = SubmitOptions::new(model)
            .aspect_ratio(self.aspect_ratio.as_deref())
            .resolution(self.resolution.as_deref());

        let mut payload = GenerationRequest::new(self.prompt);
        if let Some(raw) = self.seed_image.as_deref() {
            payload = payload.with_seed_image(SeedImage::from_data_url(raw)?);
        }

        Ok((payload, options))
    }
}

/// One scene of a batch request.
#[derive(Debug, Deserialize, Validate)]
pub struct SceneVideoRequest {
    #[garde(range(min = 1))]
    pub scene_id: u32,

    #[garde(dive)]
    #[serde(flatten)]
    pub video: VideoRequest,
}

/// Generate videos for several scenes, one after another.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchRequest {
    #[garde(length(min = 1, max = 100), dive)]
    pub scenes: Vec<SceneVideoRequest>,
}

/// Response after submitting a video request.
#[derive(Debug, Serialize)]
pub struct VideoSubmitted {
    pub id: Uuid,
    pub remote_id: Option<String>,
    pub status: JobStatus,
}

/// Response after accepting a batch.
#[derive(Debug, Serialize)]
pub struct BatchAccepted {
    pub batch_id: Uuid,
    pub jobs: Vec<BatchEntry>,
}

#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub scene_id: u32,
    pub id: Uuid,
}

/// Response for querying a tracked video job.
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoStatusResponse {
    pub id: Uuid,
    pub scene_id: Option<u32>,
    pub remote_id: Option<String>,
    pub status: Option<JobStatus>,
    pub attempts_made: u32,
    pub artifact_ready: bool,
    pub error: Option<String>,
    pub is_permission_issue: bool,
}

/// Replace the API key used for subsequent remote calls.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialUpdate {
    #[garde(length(min = 1, max = 512))]
    pub api_key: String,
}
