use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::artifact::Artifact;
use crate::models::job::Job;
use crate::models::video::VideoStatusResponse;
use crate::services::batch::BatchObserver;
use crate::services::client::JobError;

/// Host-side record of one video request.
#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub scene_id: Option<u32>,
    pub job: Option<Job>,
    pub attempts: u32,
    pub artifact: Option<Arc<Artifact>>,
    pub error: Option<String>,
    pub is_permission_issue: bool,
    pub created_at: DateTime<Utc>,
    /// Set once the job has an artifact or a final error.
    pub settled_at: Option<Instant>,
}

impl TrackedJob {
    fn new(scene_id: Option<u32>) -> Self {
        Self {
            scene_id,
            job: None,
            attempts: 0,
            artifact: None,
            error: None,
            is_permission_issue: false,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    fn expired(&self, retention: Duration) -> bool {
        self.settled_at
            .is_some_and(|settled| settled.elapsed() >= retention)
    }

    fn to_response(&self, id: Uuid) -> VideoStatusResponse {
        let attempts = self
            .job
            .as_ref()
            .map(|j| j.attempts_made())
            .unwrap_or_default()
            .max(self.attempts);

        VideoStatusResponse {
            id,
            scene_id: self.scene_id,
            remote_id: self.job.as_ref().map(|j| j.id().to_string()),
            status: self.job.as_ref().map(|j| j.status()),
            attempts_made: attempts,
            artifact_ready: self.artifact.is_some(),
            error: self.error.clone(),
            is_permission_issue: self.is_permission_issue,
        }
    }
}

/// Why an artifact cannot be served.
#[derive(Debug, PartialEq, Eq)]
pub enum ArtifactLookup {
    Unknown,
    NotReady,
}

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// In-memory map of tracked jobs. Locks are never held across an await.
///
/// Settled entries, artifact bytes included, are dropped once they are older
/// than the retention window. Pending jobs are never evicted.
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, TrackedJob>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Drop settled entries past the retention window. Returns how many went.
    pub fn evict_expired(&self) -> usize {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let before = jobs.len();
        jobs.retain(|_, tracked| !tracked.expired(self.retention));
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = jobs.len(), "Evicted settled jobs");
        }
        evicted
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut TrackedJob)) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(tracked) = jobs.get_mut(&id) {
            f(tracked);
        }
    }

    /// Register a request that has not been submitted yet.
    pub fn register(&self, scene_id: Option<u32>) -> Uuid {
        self.evict_expired();
        let id = Uuid::new_v4();
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, TrackedJob::new(scene_id));
        id
    }

    pub fn set_job(&self, id: Uuid, job: &Job) {
        self.update(id, |tracked| tracked.job = Some(job.clone()));
    }

    pub fn record_attempt(&self, id: Uuid, attempt: u32) {
        self.update(id, |tracked| tracked.attempts = tracked.attempts.max(attempt));
    }

    pub fn finish(&self, id: Uuid, job: Option<&Job>, result: &Result<Artifact, JobError>) {
        self.update(id, |tracked| {
            if let Some(job) = job {
                tracked.job = Some(job.clone());
            }
            match result {
                Ok(artifact) => {
                    tracked.artifact = Some(Arc::new(artifact.clone()));
                    tracked.error = None;
                    tracked.is_permission_issue = false;
                }
                Err(err) => {
                    tracked.error = Some(err.to_string());
                    tracked.is_permission_issue = err.is_permission_issue();
                }
            }
            tracked.settled_at = Some(Instant::now());
        });
    }

    pub fn status(&self, id: Uuid) -> Option<VideoStatusResponse> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .map(|tracked| tracked.to_response(id))
    }

    pub fn artifact(&self, id: Uuid) -> Result<Arc<Artifact>, ArtifactLookup> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let tracked = jobs.get(&id).ok_or(ArtifactLookup::Unknown)?;
        tracked.artifact.clone().ok_or(ArtifactLookup::NotReady)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Feeds batch progress into the registry.
pub struct RegistryObserver {
    registry: Arc<JobRegistry>,
    ids: HashMap<u32, Uuid>,
}

impl RegistryObserver {
    pub fn new(registry: Arc<JobRegistry>, ids: HashMap<u32, Uuid>) -> Self {
        Self { registry, ids }
    }
}

impl BatchObserver for RegistryObserver {
    fn scene_submitted(&self, scene_id: u32, job: &Job) {
        if let Some(id) = self.ids.get(&scene_id) {
            self.registry.set_job(*id, job);
        }
    }

    fn scene_polled(&self, scene_id: u32, attempt: u32) {
        if let Some(id) = self.ids.get(&scene_id) {
            self.registry.record_attempt(*id, attempt);
        }
    }

    fn scene_finished(&self, scene_id: u32, job: Option<&Job>, result: &Result<Artifact, JobError>) {
        if let Some(id) = self.ids.get(&scene_id) {
            self.registry.finish(*id, job, result);
        }
    }
}
