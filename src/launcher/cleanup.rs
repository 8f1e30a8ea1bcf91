//! Cleanup that runs on every exit path of a launch.

use crate::job::{JobService, RemoteJobHandle, RunLogs};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Scoped guard over a submitted job.
///
/// [`LogRetrievalGuard::release`] runs the cleanup inline when the event stream
/// finishes. If the guard is dropped without being released (the consumer dropped
/// the stream early), the same cleanup is spawned on the current runtime.
///
/// When log retrieval is enabled, cleanup makes one time-bounded attempt to fetch
/// the job's driver output and logs stderr then stdout, skipping empty output.
/// Failures are logged and swallowed.
pub struct LogRetrievalGuard {
    job_service: Arc<dyn JobService>,
    job: RemoteJobHandle,
    wait_for_logs: bool,
    timeout: Duration,
    released: bool,
}

impl LogRetrievalGuard {
    pub fn new(
        job_service: Arc<dyn JobService>,
        job: RemoteJobHandle,
        wait_for_logs: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            job_service,
            job,
            wait_for_logs,
            timeout,
            released: false,
        }
    }

    pub fn job(&self) -> &RemoteJobHandle {
        &self.job
    }

    pub async fn release(mut self) {
        self.released = true;
        if self.wait_for_logs {
            retrieve_and_log(self.job_service.clone(), self.job.clone(), self.timeout).await;
        } else {
            debug!(job = %self.job, "Remote log retrieval disabled");
        }
    }
}

impl Drop for LogRetrievalGuard {
    fn drop(&mut self) {
        if self.released || !self.wait_for_logs {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let job_service = self.job_service.clone();
                let job = self.job.clone();
                let timeout = self.timeout;
                handle.spawn(async move { retrieve_and_log(job_service, job, timeout).await });
            }
            Err(_) => warn!(
                job = %self.job,
                "No runtime available, skipping remote log retrieval"
            ),
        }
    }
}

async fn retrieve_and_log(job_service: Arc<dyn JobService>, job: RemoteJobHandle, timeout: Duration) {
    info!(job = %job, timeout_secs = timeout.as_secs(), "Retrieving remote job logs");

    match tokio::time::timeout(timeout, job_service.retrieve_logs(&job)).await {
        Ok(Ok(Some(logs))) => {
            for (stream, output) in captured_output(&logs) {
                info!(job = %job, "Captured {stream} for remote job:\n{output}");
            }
        }
        Ok(Ok(None)) => {
            warn!(job = %job, "Remote job logs are not available");
        }
        Ok(Err(e)) => {
            warn!(job = %job, error = %e, "Failed to retrieve remote job logs");
        }
        Err(_) => {
            warn!(
                job = %job,
                timeout_secs = timeout.as_secs(),
                "Timed out retrieving remote job logs"
            );
        }
    }
}

/// Non-empty driver output, stderr first
fn captured_output(logs: &RunLogs) -> Vec<(&'static str, &str)> {
    [("stderr", logs.stderr.as_str()), ("stdout", logs.stdout.as_str())]
        .into_iter()
        .filter(|(_, output)| !output.is_empty())
        .collect()
}
