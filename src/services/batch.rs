use std::sync::Arc;

use tracing::{info, warn};

use crate::models::artifact::Artifact;
use crate::models::job::Job;
use crate::models::request::{GenerationRequest, SubmitOptions};
use crate::services::client::{AsyncJobClient, JobError, PollConfig};

/// One scene waiting for a video.
#[derive(Debug, Clone)]
pub struct SceneJob {
    pub scene_id: u32,
    pub payload: GenerationRequest,
    pub options: SubmitOptions,
}

/// Result for one scene of a batch.
#[derive(Debug)]
pub struct SceneOutcome {
    pub scene_id: u32,
    pub result: Result<Artifact, JobError>,
}

/// Progress hooks for a running batch. All methods default to no-ops.
pub trait BatchObserver: Send + Sync {
    fn scene_started(&self, _scene_id: u32, _index: usize, _total: usize) {}
    fn scene_submitted(&self, _scene_id: u32, _job: &Job) {}
    fn scene_polled(&self, _scene_id: u32, _attempt: u32) {}
    fn scene_finished(&self, _scene_id: u32, _job: Option<&Job>, _result: &Result<Artifact, JobError>) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Generate a video for each scene, strictly one after another.
///
/// A failed scene does not stop the batch. After a permission failure the
/// remaining scenes still run; they read the credential fresh, so a key
/// rotated in the meantime is picked up.
pub async fn generate_all(
    client: &AsyncJobClient,
    scenes: Vec<SceneJob>,
    config: &PollConfig,
    observer: Arc<dyn BatchObserver>,
) -> Vec<SceneOutcome> {
    let total = scenes.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, scene) in scenes.into_iter().enumerate() {
        info!(
            scene_id = scene.scene_id,
            position = index + 1,
            total,
            "Generating scene video"
        );
        observer.scene_started(scene.scene_id, index, total);

        let (job, result) = run_scene(client, &scene, config, &observer).await;

        if let Err(err) = &result {
            if err.is_permission_issue() {
                warn!(
                    scene_id = scene.scene_id,
                    error = %err,
                    "Scene failed with a permission issue; select another API key"
                );
            } else {
                warn!(scene_id = scene.scene_id, error = %err, "Scene video failed");
            }
        }

        observer.scene_finished(scene.scene_id, job.as_ref(), &result);
        outcomes.push(SceneOutcome {
            scene_id: scene.scene_id,
            result,
        });
    }

    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!(succeeded, failed = total - succeeded, "Batch finished");
    outcomes
}

async fn run_scene(
    client: &AsyncJobClient,
    scene: &SceneJob,
    config: &PollConfig,
    observer: &Arc<dyn BatchObserver>,
) -> (Option<Job>, Result<Artifact, JobError>) {
    let mut job = match client.submit(&scene.payload, &scene.options).await {
        Ok(job) => job,
        Err(err) => return (None, Err(err)),
    };
    observer.scene_submitted(scene.scene_id, &job);

    let scene_id = scene.scene_id;
    let inner = config.on_progress.clone();
    let poll_observer = observer.clone();
    let scene_config = PollConfig {
        on_progress: Some(Arc::new(move |attempt: u32| {
            if let Some(inner) = &inner {
                inner(attempt);
            }
            poll_observer.scene_polled(scene_id, attempt);
        })),
        ..config.clone()
    };

    let result = client.await_completion(&mut job, &scene_config).await;
    (Some(job), result)
}
