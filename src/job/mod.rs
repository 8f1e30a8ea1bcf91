//! # Remote Job Service
//!
//! Capability interface over the asynchronous job-submission API, plus the
//! submitter that turns staged artifacts into a job and the monitor that polls it
//! to a terminal state.

pub mod monitor;
pub mod submitter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use monitor::{MonitorState, RemoteJobMonitor, TerminalState};
pub use submitter::RemoteJobSubmitter;

/// Job service client failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobServiceError {
    #[error("Job service request '{operation}' failed: {message}")]
    Request { operation: String, message: String },

    #[error("Job service rejected the request: {message}")]
    Rejected { message: String },
}

impl JobServiceError {
    pub fn request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Opaque identifier the job service returns for a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteJobHandle(String);

impl RemoteJobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status reported by the job service for a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted but not yet running
    Pending,
    Running,
    Succeeded,
    Failed { message: String },
}

/// A single executable invoked with arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableTask {
    /// Store URI of the uploaded entry point
    pub executable: String,
    /// Local-mount paths of the step reference, remote config, and code zip
    pub parameters: Vec<String>,
}

/// Everything the job service needs to start one remote job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Cluster/run specification, passed through untouched
    pub run_config: serde_json::Value,
    pub task: ExecutableTask,
}

/// Output captured from the remote job's driver process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLogs {
    pub stdout: String,
    pub stderr: String,
}

/// Asynchronous job-submission API
#[async_trait]
pub trait JobService: Send + Sync {
    async fn submit(&self, task: &TaskDescriptor) -> Result<RemoteJobHandle, JobServiceError>;

    async fn get_status(&self, job: &RemoteJobHandle) -> Result<JobStatus, JobServiceError>;

    /// Driver logs of a finished job, if the cluster exports them
    async fn retrieve_logs(
        &self,
        _job: &RemoteJobHandle,
    ) -> Result<Option<RunLogs>, JobServiceError> {
        Ok(None)
    }
}
