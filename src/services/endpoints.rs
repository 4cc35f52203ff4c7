//! Remote API contracts used by the job client, plus a `reqwest`
//! implementation against a long-running-operation style API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use serde_json::json;

use crate::models::artifact::Artifact;
use crate::models::job::{ErrorDetail, JobStatus, StatusReport};
use crate::models::request::{GenerationRequest, SubmitOptions};
use crate::services::credentials::Credential;

const API_KEY_HEADER: &str = "x-api-key";

/// What the submission endpoint hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAck {
    pub job_id: String,
    pub initial_status: JobStatus,
}

#[async_trait]
pub trait SubmissionEndpoint: Send + Sync {
    async fn create(
        &self,
        payload: &GenerationRequest,
        options: &SubmitOptions,
        credential: &Credential,
    ) -> Result<SubmissionAck, EndpointError>;
}

#[async_trait]
pub trait StatusEndpoint: Send + Sync {
    async fn get(&self, job_id: &str, credential: &Credential)
        -> Result<StatusReport, EndpointError>;
}

#[async_trait]
pub trait ArtifactEndpoint: Send + Sync {
    async fn fetch(&self, authenticated_url: &str) -> Result<Artifact, EndpointError>;
}

/// Operation document returned by submit and status calls.
#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    response: Option<OperationResponse>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    artifact_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: Option<i64>,
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl From<OperationError> for ErrorDetail {
    fn from(err: OperationError) -> Self {
        ErrorDetail {
            message: err.message,
            code: err.status.or_else(|| err.code.map(|c| c.to_string())),
        }
    }
}

impl Operation {
    /// A remote error wins over a missing name, so its code still reaches
    /// permission classification.
    fn into_ack(mut self) -> Result<SubmissionAck, EndpointError> {
        if let Some(error) = self.error.take() {
            return Err(EndpointError::Remote(error.into()));
        }
        if self.name.is_empty() {
            return Err(EndpointError::Malformed(
                "submission response has no operation name".to_string(),
            ));
        }

        let job_id = self.name.clone();
        Ok(SubmissionAck {
            job_id,
            initial_status: self.into_report().status,
        })
    }

    fn into_report(self) -> StatusReport {
        if let Some(error) = self.error {
            return StatusReport::failed(error.into());
        }

        if self.done {
            return StatusReport {
                status: JobStatus::Succeeded,
                artifact_ref: self.response.and_then(|r| r.artifact_uri),
                error_detail: None,
            };
        }

        let status = if self.metadata.is_some() {
            JobStatus::Running
        } else {
            JobStatus::Submitted
        };
        StatusReport {
            status,
            artifact_ref: None,
            error_detail: None,
        }
    }
}

/// HTTP client for the remote generation API.
pub struct HttpJobApi {
    http: Client,
    base_url: String,
}

impl HttpJobApi {
    /// Build a client whose every request is bounded by `request_timeout`.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, EndpointError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn submit_url(&self, model: &str) -> String {
        format!("{}/models/{}:generate", self.base_url, model)
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.base_url, job_id.trim_start_matches('/'))
    }

    fn submit_body(payload: &GenerationRequest, options: &SubmitOptions) -> serde_json::Value {
        let mut instance = json!({ "prompt": payload.prompt });
        if let Some(seed) = &payload.seed_image {
            instance["image"] = json!({
                "bytesBase64Encoded": seed.data_base64,
                "mimeType": seed.mime_type,
            });
        }

        let mut parameters = json!({
            "aspectRatio": options.aspect_ratio.to_string(),
            "resolution": options.resolution,
            "sampleCount": options.output_count,
        });
        if let Some(map) = parameters.as_object_mut() {
            for (key, value) in &payload.extra {
                map.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        json!({ "instances": [instance], "parameters": parameters })
    }
}

async fn read_operation(response: reqwest::Response) -> Result<Operation, EndpointError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EndpointError::Status {
            code: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| EndpointError::Malformed(e.to_string()))
}

#[async_trait]
impl SubmissionEndpoint for HttpJobApi {
    async fn create(
        &self,
        payload: &GenerationRequest,
        options: &SubmitOptions,
        credential: &Credential,
    ) -> Result<SubmissionAck, EndpointError> {
        let response = self
            .http
            .post(self.submit_url(&options.model))
            .header(API_KEY_HEADER, credential.expose())
            .json(&Self::submit_body(payload, options))
            .send()
            .await?;

        read_operation(response).await?.into_ack()
    }
}

#[async_trait]
impl StatusEndpoint for HttpJobApi {
    async fn get(
        &self,
        job_id: &str,
        credential: &Credential,
    ) -> Result<StatusReport, EndpointError> {
        let response = self
            .http
            .get(self.status_url(job_id))
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await?;

        Ok(read_operation(response).await?.into_report())
    }
}

#[async_trait]
impl ArtifactEndpoint for HttpJobApi {
    async fn fetch(&self, authenticated_url: &str) -> Result<Artifact, EndpointError> {
        let response = self.http.get(authenticated_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EndpointError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        Ok(Artifact {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Network error: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("Remote returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Remote error: {0}")]
    Remote(ErrorDetail),
}

impl From<reqwest::Error> for EndpointError {
    fn from(err: reqwest::Error) -> Self {
        // Download URLs carry the key, and hosts or ports must not trip the
        // message-based permission check.
        let timed_out = err.is_timeout();
        let decode = err.is_decode();
        let message = err.without_url().to_string();
        if decode {
            EndpointError::Malformed(message)
        } else {
            EndpointError::Transport { message, timed_out }
        }
    }
}

impl EndpointError {
    /// Failures worth another poll: lost connections, timeouts, 408, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            EndpointError::Transport { .. } => true,
            EndpointError::Status { code, .. } => *code >= 500 || *code == 408 || *code == 429,
            EndpointError::Malformed(_) | EndpointError::Remote(_) => false,
        }
    }

    /// Whether the call ran out of time, locally or as reported by the remote.
    pub fn is_timeout(&self) -> bool {
        match self {
            EndpointError::Transport { timed_out, .. } => *timed_out,
            EndpointError::Status { code, .. } => *code == 408 || *code == 504,
            EndpointError::Malformed(_) | EndpointError::Remote(_) => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            EndpointError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Detail used for permission classification and caller reporting.
    pub fn detail(&self) -> ErrorDetail {
        match self {
            EndpointError::Remote(detail) => detail.clone(),
            EndpointError::Status { code, body } => {
                ErrorDetail::new(format!("HTTP {code}: {body}")).with_code(code.to_string())
            }
            other => ErrorDetail::new(other.to_string()),
        }
    }
}
