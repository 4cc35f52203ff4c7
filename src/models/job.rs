use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle state of a remote generation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut)
    }
}

/// Failure details reported by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    /// Machine-checkable code from the remote, e.g. `PERMISSION_DENIED` or `404`.
    pub code: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// One status observation returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: JobStatus,
    pub artifact_ref: Option<String>,
    pub error_detail: Option<ErrorDetail>,
}

impl StatusReport {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            artifact_ref: None,
            error_detail: None,
        }
    }

    pub fn succeeded(artifact_ref: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Succeeded,
            artifact_ref: Some(artifact_ref.into()),
            error_detail: None,
        }
    }

    pub fn failed(detail: ErrorDetail) -> Self {
        Self {
            status: JobStatus::Failed,
            artifact_ref: None,
            error_detail: Some(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One outstanding asynchronous generation request.
///
/// Status only moves forward: `Submitted -> Running* -> (Succeeded | Failed | TimedOut)`.
/// `artifact_ref` is present exactly when the job succeeded and `error_detail`
/// exactly when it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    id: String,
    status: JobStatus,
    attempts_made: u32,
    artifact_ref: Option<String>,
    error_detail: Option<ErrorDetail>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job from a submission acknowledgement. Only `Submitted` and
    /// `Running` are valid starting states; anything else starts as `Running`
    /// so the first poll resolves it.
    pub fn new(id: impl Into<String>, initial: JobStatus) -> Self {
        let status = match initial {
            JobStatus::Submitted => JobStatus::Submitted,
            _ => JobStatus::Running,
        };
        let now = Utc::now();
        Self {
            id: id.into(),
            status,
            attempts_made: 0,
            artifact_ref: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn artifact_ref(&self) -> Option<&str> {
        self.artifact_ref.as_deref()
    }

    pub fn error_detail(&self) -> Option<&ErrorDetail> {
        self.error_detail.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Count one issued status poll, whether or not it produced a report.
    pub(crate) fn record_attempt(&mut self) {
        self.attempts_made += 1;
        self.updated_at = Utc::now();
    }

    /// Apply a status report from the remote.
    pub fn apply(&mut self, report: StatusReport) -> Result<(), InvalidTransition> {
        if self.is_terminal() {
            return Err(InvalidTransition {
                from: self.status,
                to: report.status,
            });
        }

        match report.status {
            // Never move back from Running to Submitted.
            JobStatus::Submitted => {}
            JobStatus::Running => self.status = JobStatus::Running,
            JobStatus::Succeeded => match report.artifact_ref.filter(|r| !r.is_empty()) {
                Some(artifact_ref) => {
                    self.status = JobStatus::Succeeded;
                    self.artifact_ref = Some(artifact_ref);
                }
                None => {
                    self.status = JobStatus::Failed;
                    self.error_detail =
                        Some(ErrorDetail::new("operation completed without an artifact"));
                }
            },
            JobStatus::Failed => {
                self.status = JobStatus::Failed;
                self.error_detail = Some(
                    report
                        .error_detail
                        .unwrap_or_else(|| ErrorDetail::new("remote job failed")),
                );
            }
            JobStatus::TimedOut => self.status = JobStatus::TimedOut,
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Force a failure observed locally, e.g. a fatal error while polling.
    pub fn fail(&mut self, detail: ErrorDetail) -> Result<(), InvalidTransition> {
        self.apply(StatusReport::failed(detail))
    }

    /// Mark the job as out of poll budget.
    pub fn time_out(&mut self) -> Result<(), InvalidTransition> {
        self.apply(StatusReport {
            status: JobStatus::TimedOut,
            artifact_ref: None,
            error_detail: None,
        })
    }
}
