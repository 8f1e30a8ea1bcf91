//! # Step Launcher
//!
//! Entry point tying the pieces together: package the step, submit it as a remote
//! job, then hand back a [`LaunchedStep`] that streams the step's domain events as
//! they are recovered from the remote event log.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use remote_step_launcher::{
//!     CancellationSignal, InMemoryArtifactStore, LauncherConfig, StepLauncher,
//!     StepRunReference, StorageBinding,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(job_service: Arc<dyn remote_step_launcher::JobService>) -> Result<(), Box<dyn std::error::Error>> {
//! let storage = StorageBinding::S3 {
//!     secret_scope: "launcher".to_string(),
//!     access_key_key: "aws-access-key".to_string(),
//!     secret_key_key: "aws-secret-key".to_string(),
//! };
//! let config = LauncherConfig::new("https://jobs.example.com", storage, "./pkg", "./step_main.py");
//! let launcher = StepLauncher::new(
//!     Arc::new(config),
//!     Arc::new(InMemoryArtifactStore::new()),
//!     job_service,
//! );
//!
//! let mut step = launcher
//!     .launch_step(&StepRunReference::new("run-1", "transform"), CancellationSignal::new())
//!     .await?;
//! while let Some(event) = step.next().await {
//!     println!("{}", event?.event_type);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod cleanup;
mod stream;

use crate::config::LauncherConfig;
use crate::constants::operations;
use crate::error::LaunchResult;
use crate::job::{JobService, RemoteJobHandle, RemoteJobMonitor, RemoteJobSubmitter};
use crate::logging::log_launch_operation;
use crate::models::{DomainEvent, StepRunReference};
use crate::packaging::{StagedArtifacts, StepPackager};
use crate::recovery::{EventRecordSink, EventStreamRecovery, RetryPolicy, TracingRecordSink};
use crate::storage::{ArtifactStore, PathLayout};
use futures::stream::{BoxStream, Fuse, FusedStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tracing::{info, instrument};

pub use cancellation::CancellationSignal;
pub use cleanup::LogRetrievalGuard;

use stream::EventPump;

/// Launches steps against one job service and artifact store
pub struct StepLauncher {
    config: Arc<LauncherConfig>,
    store: Arc<dyn ArtifactStore>,
    job_service: Arc<dyn JobService>,
    sink: Arc<dyn EventRecordSink>,
}

impl StepLauncher {
    pub fn new(
        config: Arc<LauncherConfig>,
        store: Arc<dyn ArtifactStore>,
        job_service: Arc<dyn JobService>,
    ) -> Self {
        Self {
            config,
            store,
            job_service,
            sink: Arc::new(TracingRecordSink),
        }
    }

    /// Replace the sink that receives every recovered remote record
    pub fn with_record_sink(mut self, sink: Arc<dyn EventRecordSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    fn packager(&self) -> StepPackager {
        StepPackager::new(
            self.store.clone(),
            PathLayout::from_config(&self.config.staging),
            &self.config.entry_point_path,
            &self.config.local_job_package_path,
        )
    }

    /// Package, upload, and submit a step.
    ///
    /// Invalid configuration, upload failures and submission failures are
    /// returned directly and nothing is polled. Once the job is submitted, every later outcome is delivered
    /// through the returned stream.
    #[instrument(skip_all, fields(run_id = %step_run_ref.run_id, step_key = %step_run_ref.step_key))]
    pub async fn launch_step(
        &self,
        step_run_ref: &StepRunReference,
        cancellation: CancellationSignal,
    ) -> LaunchResult<LaunchedStep> {
        if let Err(err) = self.config.validate() {
            self.log_failure(step_run_ref, None, &err.to_string());
            return Err(err.into());
        }

        let artifacts = match self
            .packager()
            .package(step_run_ref, &self.config.remote_config())
            .await
        {
            Ok(artifacts) => artifacts,
            Err(err) => {
                self.log_failure(step_run_ref, None, &err.to_string());
                return Err(err);
            }
        };
        log_launch_operation(
            operations::ARTIFACTS_UPLOADED,
            &step_run_ref.run_id,
            &step_run_ref.step_key,
            None,
            "uploaded",
            None,
        );

        let submitter =
            RemoteJobSubmitter::new(self.job_service.clone(), self.config.run_config.clone());
        let job = match submitter.submit(&artifacts).await {
            Ok(job) => job,
            Err(err) => {
                self.log_failure(step_run_ref, None, &err.to_string());
                return Err(err);
            }
        };
        let submitted_at = Instant::now();
        log_launch_operation(
            operations::JOB_SUBMITTED,
            &step_run_ref.run_id,
            &step_run_ref.step_key,
            Some(job.as_str()),
            "submitted",
            None,
        );

        Ok(self.event_stream(step_run_ref, job, artifacts, submitted_at, cancellation))
    }

    /// Re-attach to a job that was already submitted for this step.
    ///
    /// Recovery starts again at offset zero, so every event in the log is
    /// delivered again. The wait budget is measured from the moment of
    /// re-attachment.
    pub fn attach(
        &self,
        step_run_ref: &StepRunReference,
        job: RemoteJobHandle,
        cancellation: CancellationSignal,
    ) -> LaunchResult<LaunchedStep> {
        self.config.validate()?;
        let artifacts = self.packager().artifacts_for(step_run_ref)?;
        info!(
            run_id = %step_run_ref.run_id,
            step_key = %step_run_ref.step_key,
            job = %job,
            "Attaching to submitted remote job"
        );
        Ok(self.event_stream(step_run_ref, job, artifacts, Instant::now(), cancellation))
    }

    fn event_stream(
        &self,
        step_run_ref: &StepRunReference,
        job: RemoteJobHandle,
        artifacts: StagedArtifacts,
        submitted_at: Instant,
        cancellation: CancellationSignal,
    ) -> LaunchedStep {
        let polling = &self.config.polling;
        let monitor = RemoteJobMonitor::with_start(
            self.job_service.clone(),
            job.clone(),
            polling.max_completion_wait(),
            submitted_at,
        );
        let recovery = EventStreamRecovery::new(
            self.store.clone(),
            artifacts.events.store_uri(),
            RetryPolicy::new(
                polling.event_log_read_attempts,
                polling.event_log_retry_delay(),
            ),
            self.sink.clone(),
        );
        let guard = LogRetrievalGuard::new(
            self.job_service.clone(),
            job.clone(),
            self.config.wait_for_logs,
            self.config.log_retrieval_timeout(),
        );

        let events = EventPump::new(
            &step_run_ref.run_id,
            &step_run_ref.step_key,
            monitor,
            recovery,
            cancellation,
            polling.poll_interval(),
            guard,
        )
        .into_stream();

        LaunchedStep {
            job,
            artifacts,
            events,
        }
    }

    fn log_failure(&self, step_run_ref: &StepRunReference, job: Option<&str>, details: &str) {
        log_launch_operation(
            operations::LAUNCH_FAILED,
            &step_run_ref.run_id,
            &step_run_ref.step_key,
            job,
            "failed",
            Some(details),
        );
    }
}

/// A submitted step and the stream of its domain events.
///
/// The stream is finite and yields each recovered event once, in log order. A
/// fatal condition is delivered as a final `Err` item, and polling after the end
/// keeps returning `None`. Dropping the stream before it ends still triggers the
/// configured log retrieval.
pub struct LaunchedStep {
    job: RemoteJobHandle,
    artifacts: StagedArtifacts,
    events: Fuse<BoxStream<'static, LaunchResult<DomainEvent>>>,
}

impl LaunchedStep {
    pub fn job(&self) -> &RemoteJobHandle {
        &self.job
    }

    pub fn artifacts(&self) -> &StagedArtifacts {
        &self.artifacts
    }
}

impl Stream for LaunchedStep {
    type Item = LaunchResult<DomainEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

impl FusedStream for LaunchedStep {
    fn is_terminated(&self) -> bool {
        self.events.is_terminated()
    }
}

impl std::fmt::Debug for LaunchedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedStep")
            .field("job", &self.job)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}
