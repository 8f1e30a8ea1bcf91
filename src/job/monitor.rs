//! Polling a submitted job to a terminal state within a wall-clock budget.

use super::{JobService, JobStatus, RemoteJobHandle};
use crate::error::{LaunchError, LaunchResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// How a monitored job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Succeeded,
    Failed,
    TimedOut,
}

/// Monitor lifecycle: `Submitted → Running → Terminal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Submitted,
    Running,
    Terminal(TerminalState),
}

pub struct RemoteJobMonitor {
    job_service: Arc<dyn JobService>,
    job: RemoteJobHandle,
    started_at: Instant,
    max_wait: Duration,
    state: MonitorState,
}

impl RemoteJobMonitor {
    /// Start monitoring a job submitted just now
    pub fn new(job_service: Arc<dyn JobService>, job: RemoteJobHandle, max_wait: Duration) -> Self {
        Self::with_start(job_service, job, max_wait, Instant::now())
    }

    pub fn with_start(
        job_service: Arc<dyn JobService>,
        job: RemoteJobHandle,
        max_wait: Duration,
        started_at: Instant,
    ) -> Self {
        Self {
            job_service,
            job,
            started_at,
            max_wait,
            state: MonitorState::Submitted,
        }
    }

    pub fn job(&self) -> &RemoteJobHandle {
        &self.job
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Query the job once.
    ///
    /// Returns `Ok(true)` once the job succeeded and `Ok(false)` while it is still
    /// pending or running. A failed job, an exhausted wait budget, or a failed status
    /// query is returned as an error.
    pub async fn poll(&mut self) -> LaunchResult<bool> {
        let status = self.job_service.get_status(&self.job).await?;

        match status {
            JobStatus::Succeeded => {
                self.state = MonitorState::Terminal(TerminalState::Succeeded);
                info!(job = %self.job, "Remote job completed successfully");
                Ok(true)
            }
            JobStatus::Failed { message } => {
                self.state = MonitorState::Terminal(TerminalState::Failed);
                error!(job = %self.job, message = %message, "Remote job failed");
                Err(LaunchError::remote_failure(self.job.as_str(), message))
            }
            JobStatus::Pending | JobStatus::Running => {
                let elapsed = self.elapsed();
                if elapsed > self.max_wait {
                    self.state = MonitorState::Terminal(TerminalState::TimedOut);
                    error!(
                        job = %self.job,
                        elapsed_secs = elapsed.as_secs_f64(),
                        max_wait_secs = self.max_wait.as_secs(),
                        "Remote job exceeded its maximum wait time"
                    );
                    return Err(LaunchError::job_timeout(
                        self.job.as_str(),
                        self.max_wait.as_secs(),
                    ));
                }

                if status == JobStatus::Running {
                    self.state = MonitorState::Running;
                }
                info!(
                    job = %self.job,
                    status = ?status,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Remote job still in progress"
                );
                Ok(false)
            }
        }
    }
}
