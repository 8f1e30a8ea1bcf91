//! Submission of a packaged step as a single remote job.

use super::{ExecutableTask, JobService, RemoteJobHandle, TaskDescriptor};
use crate::error::{LaunchError, LaunchResult};
use crate::packaging::StagedArtifacts;
use std::sync::Arc;
use tracing::{error, info};

/// Builds the task descriptor for staged artifacts and submits it.
///
/// Submission is never retried: a failed submit has no partial-success
/// interpretation and ends the launch before any polling starts.
pub struct RemoteJobSubmitter {
    job_service: Arc<dyn JobService>,
    run_config: serde_json::Value,
}

impl RemoteJobSubmitter {
    pub fn new(job_service: Arc<dyn JobService>, run_config: serde_json::Value) -> Self {
        Self {
            job_service,
            run_config,
        }
    }

    /// Descriptor pointing the job at the entry point with the three remote-side
    /// argument paths, rendered for the cluster's local mount
    pub fn task_descriptor(&self, artifacts: &StagedArtifacts) -> TaskDescriptor {
        TaskDescriptor {
            run_config: self.run_config.clone(),
            task: ExecutableTask {
                executable: artifacts.entry_point.store_uri(),
                parameters: vec![
                    artifacts.step_run_ref.mount_path(),
                    artifacts.remote_config.mount_path(),
                    artifacts.code_zip.mount_path(),
                ],
            },
        }
    }

    pub async fn submit(&self, artifacts: &StagedArtifacts) -> LaunchResult<RemoteJobHandle> {
        let descriptor = self.task_descriptor(artifacts);

        match self.job_service.submit(&descriptor).await {
            Ok(handle) => {
                info!(
                    job = %handle,
                    executable = %descriptor.task.executable,
                    "Remote job submitted"
                );
                Ok(handle)
            }
            Err(e) => {
                error!(
                    executable = %descriptor.task.executable,
                    error = %e,
                    "Remote job submission failed"
                );
                Err(LaunchError::submission(e.to_string()))
            }
        }
    }
}
