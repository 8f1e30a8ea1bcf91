//! Remote-side writer of the step event log.

use super::EventLogWriteError;
use crate::models::{DomainEvent, EventLogRecord, LogLevel, RemoteEventRecord};
use crate::storage::ArtifactStore;
use std::sync::Arc;
use tracing::debug;

/// Appends records to the event log of one (run, step).
///
/// Every flush rewrites the whole object with all lines written so far, so a
/// reader never observes records out of order. After [`EventLogWriter::complete`]
/// the log is closed and further appends are refused.
pub struct EventLogWriter {
    store: Arc<dyn ArtifactStore>,
    path: String,
    run_id: String,
    step_key: String,
    contents: Vec<u8>,
    records: usize,
    completed: bool,
}

impl EventLogWriter {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        path: impl Into<String>,
        run_id: impl Into<String>,
        step_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            run_id: run_id.into(),
            step_key: step_key.into(),
            contents: Vec::new(),
            records: 0,
            completed: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Records appended so far, not counting the sentinel
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub async fn append(&mut self, record: EventLogRecord) -> Result<(), EventLogWriteError> {
        self.write_record(&RemoteEventRecord::Event(record)).await?;
        self.records += 1;
        Ok(())
    }

    /// Append a log record for this step, optionally carrying a domain event
    pub async fn log(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        event: Option<&DomainEvent>,
    ) -> Result<(), EventLogWriteError> {
        let mut record = EventLogRecord::new(&self.run_id, &self.step_key, level, message);
        if let Some(event) = event {
            record = record.with_event(event)?;
        }
        self.append(record).await
    }

    /// Append the completion sentinel and close the log
    pub async fn complete(&mut self) -> Result<(), EventLogWriteError> {
        self.write_record(&RemoteEventRecord::LogsComplete).await?;
        self.completed = true;
        debug!(path = %self.path, records = self.records, "Event log completed");
        Ok(())
    }

    async fn write_record(&mut self, record: &RemoteEventRecord) -> Result<(), EventLogWriteError> {
        if self.completed {
            return Err(EventLogWriteError::AlreadyComplete {
                path: self.path.clone(),
            });
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut contents = self.contents.clone();
        contents.extend_from_slice(&line);
        self.store.write(&self.path, contents.clone()).await?;
        self.contents = contents;
        Ok(())
    }
}
