//! Scripted stand-ins for the job service and artifact store.

use async_trait::async_trait;
use parking_lot::Mutex;
use remote_step_launcher::{
    ArtifactStore, InMemoryArtifactStore, JobService, JobServiceError, JobStatus,
    RemoteJobHandle, RunLogs, StoreError, TaskDescriptor,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

type StatusHook = Box<dyn Fn(usize) + Send + Sync>;

/// Job service that answers status queries from a script.
///
/// Once the script is exhausted the last scripted status repeats. The optional
/// hook runs with the zero-based call index before each status is returned, which
/// lets a test play the remote writer at a chosen tick.
pub struct ScriptedJobService {
    statuses: Mutex<VecDeque<Result<JobStatus, JobServiceError>>>,
    last: Mutex<Result<JobStatus, JobServiceError>>,
    on_status: Option<StatusHook>,
    reject_submit: bool,
    logs: Option<RunLogs>,
    submitted: Mutex<Vec<TaskDescriptor>>,
    status_calls: AtomicUsize,
    log_retrievals: AtomicUsize,
}

impl ScriptedJobService {
    pub fn new(statuses: Vec<Result<JobStatus, JobServiceError>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            last: Mutex::new(Ok(JobStatus::Pending)),
            on_status: None,
            reject_submit: false,
            logs: None,
            submitted: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            log_retrievals: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(statuses: Vec<JobStatus>) -> Self {
        Self::new(statuses.into_iter().map(Ok).collect())
    }

    pub fn on_status(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Box::new(hook));
        self
    }

    pub fn rejecting_submissions(mut self) -> Self {
        self.reject_submit = true;
        self
    }

    pub fn with_logs(mut self, stdout: &str, stderr: &str) -> Self {
        self.logs = Some(RunLogs {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn log_retrievals(&self) -> usize {
        self.log_retrievals.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<TaskDescriptor> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl JobService for ScriptedJobService {
    async fn submit(&self, task: &TaskDescriptor) -> Result<RemoteJobHandle, JobServiceError> {
        if self.reject_submit {
            return Err(JobServiceError::rejected("workspace quota exceeded"));
        }
        let mut submitted = self.submitted.lock();
        submitted.push(task.clone());
        Ok(RemoteJobHandle::new(format!("job-{}", submitted.len())))
    }

    async fn get_status(&self, _job: &RemoteJobHandle) -> Result<JobStatus, JobServiceError> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_status {
            hook(call);
        }

        let next = self.statuses.lock().pop_front();
        match next {
            Some(status) => {
                *self.last.lock() = status.clone();
                status
            }
            None => self.last.lock().clone(),
        }
    }

    async fn retrieve_logs(
        &self,
        _job: &RemoteJobHandle,
    ) -> Result<Option<RunLogs>, JobServiceError> {
        self.log_retrievals.fetch_add(1, Ordering::SeqCst);
        Ok(self.logs.clone())
    }
}

/// Artifact store with scripted event-log reads and failure injection.
///
/// Writes and reads of every other path go straight to the wrapped in-memory
/// store. Reads of the scripted path first consume injected failures, then
/// return the scripted snapshots in order (the last one repeats). A `None`
/// snapshot reads as never written. Without a script, reads fall through to the
/// in-memory store.
pub struct ScriptedStore {
    inner: InMemoryArtifactStore,
    scripted_path: Mutex<Option<String>>,
    script: Mutex<Option<SnapshotScript>>,
    read_failures: Mutex<VecDeque<StoreError>>,
    fail_writes: bool,
    scripted_reads: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: InMemoryArtifactStore) -> Self {
        Self {
            inner,
            scripted_path: Mutex::new(None),
            script: Mutex::new(None),
            read_failures: Mutex::new(VecDeque::new()),
            fail_writes: false,
            scripted_reads: AtomicUsize::new(0),
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn script(&self, path: impl Into<String>, snapshots: Vec<Option<Vec<u8>>>) {
        *self.scripted_path.lock() = Some(path.into());
        *self.script.lock() = Some(SnapshotScript {
            remaining: snapshots.into(),
            last: None,
        });
    }

    /// Fail the next `count` reads of `path` with a transient error
    pub fn fail_reads(&self, path: impl Into<String>, count: usize) {
        let path = path.into();
        let mut failures = self.read_failures.lock();
        for attempt in 0..count {
            failures.push_back(StoreError::io(&path, format!("connection reset ({attempt})")));
        }
        let mut scripted = self.scripted_path.lock();
        if scripted.is_none() {
            *scripted = Some(path);
        }
    }

    /// Reads of the scripted path, including failed ones
    pub fn scripted_reads(&self) -> usize {
        self.scripted_reads.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryArtifactStore {
        &self.inner
    }
}

#[async_trait]
impl ArtifactStore for ScriptedStore {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::io(path, "storage unavailable"));
        }
        self.inner.write(path, bytes).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let scripted = self.scripted_path.lock().as_deref() == Some(path);
        if !scripted {
            return self.inner.read(path).await;
        }

        self.scripted_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.read_failures.lock().pop_front() {
            return Err(err);
        }

        let snapshot = self.script.lock().as_mut().map(SnapshotScript::next);
        match snapshot {
            Some(snapshot) => snapshot.ok_or_else(|| StoreError::not_found(path)),
            None => self.inner.read(path).await,
        }
    }
}

struct SnapshotScript {
    remaining: VecDeque<Option<Vec<u8>>>,
    last: Option<Vec<u8>>,
}

impl SnapshotScript {
    fn next(&mut self) -> Option<Vec<u8>> {
        if let Some(snapshot) = self.remaining.pop_front() {
            self.last = snapshot;
        }
        self.last.clone()
    }
}
