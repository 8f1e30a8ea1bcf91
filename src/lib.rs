#![allow(clippy::doc_markdown)] // Allow technical terms like ADLS2, JSONL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Remote Step Launcher
//!
//! Runs a single workflow step as a job on a remote compute cluster and recovers
//! the step's event stream while it runs.
//!
//! ## Overview
//!
//! The launcher stages the step's code, inputs, and remote configuration in shared
//! storage, submits one job that runs a remote entry point against them, and then
//! polls. The remote side appends newline-delimited JSON records to an event log in
//! the same storage; the launcher re-reads the log on every poll tick and forwards
//! only the records it has not seen yet. A completion sentinel written by the remote
//! side marks the end of the log.
//!
//! ## Module Organization
//!
//! - [`launcher`] - Launch entry point and the event stream of a launched step
//! - [`packaging`] - Staging of entry point, code zip, step reference, and config
//! - [`job`] - Job service interface, submission, and status monitoring
//! - [`recovery`] - Incremental event-log reader with bounded retries
//! - [`storage`] - Artifact store interface, implementations, and path layout
//! - [`remote`] - Remote-side bootstrap and event-log writer
//! - [`models`] - Step reference, remote config, and event record types
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Event Delivery
//!
//! - Each record index is forwarded at most once, in log order
//! - A log that does not exist yet is "nothing new", never an error
//! - Transient read failures are retried a bounded number of times
//! - Every fatal condition ends the stream with a final error item
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod job;
pub mod launcher;
pub mod logging;
pub mod models;
pub mod packaging;
pub mod recovery;
pub mod remote;
pub mod storage;

pub use config::{ConfigManager, ConfigurationError, LauncherConfig};
pub use error::{LaunchError, LaunchResult};
pub use job::{
    JobService, JobServiceError, JobStatus, RemoteJobHandle, RemoteJobMonitor,
    RemoteJobSubmitter, RunLogs, TaskDescriptor,
};
pub use launcher::{CancellationSignal, LaunchedStep, StepLauncher};
pub use models::{
    DomainEvent, EventLogRecord, LogLevel, RemoteConfig, RemoteEventRecord, SecretBinding,
    StepRunReference, StorageBinding,
};
pub use packaging::{StagedArtifacts, StepPackager};
pub use recovery::{
    EventBatch, EventLogOffset, EventRecordSink, EventStreamRecovery, RetryPolicy,
    TracingRecordSink,
};
pub use storage::{
    ArtifactStore, InMemoryArtifactStore, LocalFsArtifactStore, PathLayout, RemoteArtifactPath,
    StoreError,
};
