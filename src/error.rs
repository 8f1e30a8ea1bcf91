//! # Launch Error Types
//!
//! Every way a remote step launch can end unsuccessfully. Fatal kinds terminate the
//! event stream as its final item; a missing event log is not an error and never
//! appears here.

use crate::config::ConfigurationError;
use crate::job::JobServiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Artifact upload failed for {path}: {message}")]
    ArtifactUpload { path: String, message: String },

    #[error("Packaging failed: {message}")]
    Packaging { message: String },

    /// The job service rejected the submission; nothing was polled
    #[error("Job submission failed: {message}")]
    Submission { message: String },

    /// Remote storage or job service failed after the bounded retries
    #[error("Remote service error during {operation}: {message}")]
    RemoteService { operation: String, message: String },

    #[error("Remote job {job} did not complete within {max_wait_seconds}s")]
    JobTimeout { job: String, max_wait_seconds: u64 },

    #[error("Timed out after {max_wait_seconds}s waiting for event logs of remote job {job}")]
    LogAvailabilityTimeout { job: String, max_wait_seconds: u64 },

    /// The remote job itself reported failure
    #[error("Remote job {job} failed: {message}")]
    RemoteFailure { job: String, message: String },

    #[error("Event log record {index} could not be decoded: {message}")]
    EventDecode { index: usize, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Launch of step {step_key} was cancelled")]
    Cancelled { step_key: String },
}

impl LaunchError {
    pub fn artifact_upload(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArtifactUpload {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn packaging(message: impl Into<String>) -> Self {
        Self::Packaging {
            message: message.into(),
        }
    }

    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
        }
    }

    pub fn remote_service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteService {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn job_timeout(job: impl Into<String>, max_wait_seconds: u64) -> Self {
        Self::JobTimeout {
            job: job.into(),
            max_wait_seconds,
        }
    }

    pub fn log_availability_timeout(job: impl Into<String>, max_wait_seconds: u64) -> Self {
        Self::LogAvailabilityTimeout {
            job: job.into(),
            max_wait_seconds,
        }
    }

    pub fn remote_failure(job: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            job: job.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(step_key: impl Into<String>) -> Self {
        Self::Cancelled {
            step_key: step_key.into(),
        }
    }

    /// Whether the launch ended because a wait budget was exhausted
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            LaunchError::JobTimeout { .. } | LaunchError::LogAvailabilityTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for LaunchError {
    fn from(err: serde_json::Error) -> Self {
        LaunchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<JobServiceError> for LaunchError {
    fn from(err: JobServiceError) -> Self {
        LaunchError::remote_service("job_status", err.to_string())
    }
}

pub type LaunchResult<T> = Result<T, LaunchError>;
