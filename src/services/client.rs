//! Submit → poll → download driver for remote generation jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::models::artifact::Artifact;
use crate::models::job::{ErrorDetail, InvalidTransition, Job, JobStatus};
use crate::models::request::{GenerationRequest, SubmitOptions};
use crate::services::classify::ErrorClassifier;
use crate::services::credentials::{Credential, CredentialProvider};
use crate::services::endpoints::{
    ArtifactEndpoint, EndpointError, StatusEndpoint, SubmissionEndpoint,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

/// Called once per poll with the 1-based attempt index. Must return quickly.
pub type ProgressFn = Arc<dyn Fn(u32) + Send + Sync>;

/// Polling budget for [`AsyncJobClient::await_completion`].
#[derive(Clone)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub on_progress: Option<ProgressFn>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            on_progress: None,
        }
    }
}

impl PollConfig {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
            on_progress: None,
        }
    }

    pub fn on_progress(mut self, callback: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for PollConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollConfig")
            .field("poll_interval", &self.poll_interval)
            .field("max_attempts", &self.max_attempts)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Append the credential to an artifact locator as a `key` query parameter.
pub fn authenticated_url(base: &str, key: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}key={key}")
}

/// Drives one generation request from submission to downloaded bytes.
///
/// A credential is looked up immediately before every remote call and is
/// never reused, so a key rotated by the host while a job is in flight takes
/// effect on the next poll.
pub struct AsyncJobClient {
    submission: Arc<dyn SubmissionEndpoint>,
    status: Arc<dyn StatusEndpoint>,
    artifacts: Arc<dyn ArtifactEndpoint>,
    credentials: Arc<dyn CredentialProvider>,
    classifier: ErrorClassifier,
}

impl AsyncJobClient {
    /// Client over an API that serves all three endpoints.
    pub fn new<A>(api: Arc<A>, credentials: Arc<dyn CredentialProvider>) -> Self
    where
        A: SubmissionEndpoint + StatusEndpoint + ArtifactEndpoint + 'static,
    {
        Self::from_parts(api.clone(), api.clone(), api, credentials)
    }

    pub fn from_parts(
        submission: Arc<dyn SubmissionEndpoint>,
        status: Arc<dyn StatusEndpoint>,
        artifacts: Arc<dyn ArtifactEndpoint>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            submission,
            status,
            artifacts,
            credentials,
            classifier: ErrorClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    fn credential(&self) -> Result<Credential, JobError> {
        self.credentials
            .current()
            .map_err(|_| JobError::MissingCredential)
    }

    /// Submit a generation request. Never retried: a second creation call
    /// could start a duplicate remote job.
    pub async fn submit(
        &self,
        payload: &GenerationRequest,
        options: &SubmitOptions,
    ) -> Result<Job, JobError> {
        let credential = self.credential()?;

        let ack = match self.submission.create(payload, options, &credential).await {
            Ok(ack) => ack,
            Err(err) => {
                let is_permission_issue = self.classifier.is_permission_issue(&err.detail());
                metrics::counter!("generation_jobs_failed_total", "reason" => "submission")
                    .increment(1);
                error!(model = %options.model, error = %err, is_permission_issue, "Job submission failed");
                return Err(JobError::Submission {
                    source: err,
                    is_permission_issue,
                });
            }
        };

        let job = Job::new(ack.job_id, ack.initial_status);
        metrics::counter!("generation_jobs_submitted_total").increment(1);
        info!(
            job_id = %job.id(),
            model = %options.model,
            aspect_ratio = %options.aspect_ratio,
            status = %job.status(),
            "Generation job submitted"
        );
        Ok(job)
    }

    /// Poll `job` until it leaves the non-terminal states, then download its
    /// artifact.
    pub async fn await_completion(
        &self,
        job: &mut Job,
        config: &PollConfig,
    ) -> Result<Artifact, JobError> {
        let start = Instant::now();
        let result = self.complete(job, config).await;

        metrics::histogram!("generation_job_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(artifact) => {
                metrics::counter!("generation_jobs_succeeded_total").increment(1);
                info!(
                    job_id = %job.id(),
                    attempts = job.attempts_made(),
                    bytes = artifact.len(),
                    "Generation job completed"
                );
            }
            Err(err) => {
                metrics::counter!("generation_jobs_failed_total", "reason" => err.reason())
                    .increment(1);
                error!(
                    job_id = %job.id(),
                    attempts = job.attempts_made(),
                    status = %job.status(),
                    error = %err,
                    is_permission_issue = err.is_permission_issue(),
                    "Generation job did not complete"
                );
            }
        }

        result
    }

    /// Submit and wait in one call.
    pub async fn run(
        &self,
        payload: &GenerationRequest,
        options: &SubmitOptions,
        config: &PollConfig,
    ) -> Result<Artifact, JobError> {
        let mut job = self.submit(payload, options).await?;
        self.await_completion(&mut job, config).await
    }

    async fn complete(&self, job: &mut Job, config: &PollConfig) -> Result<Artifact, JobError> {
        self.poll_until_settled(job, config).await?;

        match job.status() {
            JobStatus::Succeeded => self.download(job).await,
            JobStatus::Failed => {
                let detail = job
                    .error_detail()
                    .cloned()
                    .unwrap_or_else(|| ErrorDetail::new("remote job failed"));
                let is_permission_issue = self.classifier.is_permission_issue(&detail);
                Err(JobError::RemoteJob {
                    detail,
                    is_permission_issue,
                })
            }
            JobStatus::TimedOut => Err(JobError::Timeout {
                attempts: job.attempts_made(),
            }),
            JobStatus::Submitted | JobStatus::Running => {
                job.time_out()?;
                Err(JobError::Timeout {
                    attempts: job.attempts_made(),
                })
            }
        }
    }

    async fn poll_until_settled(&self, job: &mut Job, config: &PollConfig) -> Result<(), JobError> {
        while !job.is_terminal() && job.attempts_made() < config.max_attempts {
            tokio::time::sleep(config.poll_interval).await;

            // A missing key leaves the job untouched so the caller can rotate
            // the key and resume.
            let credential = self.credential()?;

            job.record_attempt();
            let attempt = job.attempts_made();
            metrics::counter!("generation_job_polls_total").increment(1);
            if let Some(on_progress) = &config.on_progress {
                on_progress(attempt);
            }

            match self.status.get(job.id(), &credential).await {
                Ok(report) => {
                    job.apply(report)?;
                    debug!(job_id = %job.id(), attempt, status = %job.status(), "Polled job status");
                }
                Err(err) => {
                    let detail = err.detail();
                    if !self.classifier.is_permission_issue(&detail) && err.is_transient() {
                        warn!(
                            job_id = %job.id(),
                            attempt,
                            max_attempts = config.max_attempts,
                            timed_out = err.is_timeout(),
                            error = %err,
                            "Transient error while polling, will retry"
                        );
                        continue;
                    }
                    job.fail(detail)?;
                }
            }
        }
        Ok(())
    }

    async fn download(&self, job: &Job) -> Result<Artifact, JobError> {
        let artifact_ref = job.artifact_ref().ok_or_else(|| JobError::Download {
            status: None,
            message: "job has no artifact locator".to_string(),
        })?;

        let credential = self.credential()?;
        let url = authenticated_url(artifact_ref, credential.expose());

        debug!(job_id = %job.id(), "Downloading artifact");
        self.artifacts
            .fetch(&url)
            .await
            .map_err(|err| JobError::Download {
                status: err.status_code(),
                message: err.to_string(),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job submission failed: {source}")]
    Submission {
        #[source]
        source: EndpointError,
        is_permission_issue: bool,
    },

    #[error("Job did not finish after {attempts} status polls")]
    Timeout { attempts: u32 },

    #[error("Remote job failed: {detail}")]
    RemoteJob {
        detail: ErrorDetail,
        is_permission_issue: bool,
    },

    #[error("Artifact download failed: {message}")]
    Download { status: Option<u16>, message: String },

    #[error("No API key is available")]
    MissingCredential,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl JobError {
    /// Whether the caller should pick a different credential before retrying.
    pub fn is_permission_issue(&self) -> bool {
        match self {
            JobError::Submission {
                is_permission_issue,
                ..
            }
            | JobError::RemoteJob {
                is_permission_issue,
                ..
            } => *is_permission_issue,
            JobError::MissingCredential => true,
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            JobError::Submission { .. } => "submission",
            JobError::Timeout { .. } => "timeout",
            JobError::RemoteJob { .. } => "remote",
            JobError::Download { .. } => "download",
            JobError::MissingCredential => "credential",
            JobError::InvalidTransition(_) => "transition",
        }
    }
}
