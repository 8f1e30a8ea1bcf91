//! # Event Stream Recovery
//!
//! Incremental reader for the append-only remote event log. Each read cycle pulls
//! the whole object, skips the records already forwarded, and returns the domain
//! events found in the new suffix together with the advanced offset.
//!
//! The log is newline-delimited JSON. Only newline-terminated lines count as
//! records, so a line the remote side is still flushing stays invisible until it
//! is complete. The completion sentinel moves the offset to
//! [`EventLogOffset::Complete`], after which reads are no-ops.

pub mod retry;
pub mod sink;

use crate::error::{LaunchError, LaunchResult};
use crate::models::{DomainEvent, EventLogRecord, RemoteEventRecord};
use crate::storage::{ArtifactStore, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use retry::{ReadFailure, RetryPolicy};
pub use sink::{CollectingRecordSink, EventRecordSink, TracingRecordSink};

/// Position in the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventLogOffset {
    /// Number of records already forwarded
    Consumed(usize),
    /// The sentinel was observed; nothing further will be read
    Complete,
}

impl Default for EventLogOffset {
    fn default() -> Self {
        EventLogOffset::Consumed(0)
    }
}

impl EventLogOffset {
    pub fn is_complete(&self) -> bool {
        matches!(self, EventLogOffset::Complete)
    }

    /// Records consumed so far, `None` once complete
    pub fn consumed(&self) -> Option<usize> {
        match self {
            EventLogOffset::Consumed(n) => Some(*n),
            EventLogOffset::Complete => None,
        }
    }

    /// Integer form used in logs, `-1` once complete
    pub fn as_raw(&self) -> i64 {
        match self {
            EventLogOffset::Consumed(n) => i64::try_from(*n).unwrap_or(i64::MAX),
            EventLogOffset::Complete => -1,
        }
    }
}

impl fmt::Display for EventLogOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLogOffset::Consumed(n) => write!(f, "{n}"),
            EventLogOffset::Complete => write!(f, "complete"),
        }
    }
}

/// Result of one read cycle
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub events: Vec<DomainEvent>,
    pub offset: EventLogOffset,
}

impl EventBatch {
    pub fn empty(offset: EventLogOffset) -> Self {
        Self {
            events: Vec::new(),
            offset,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.offset.is_complete()
    }
}

#[derive(Debug)]
enum ReadError {
    Store(StoreError),
    Decode { index: usize, message: String },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Store(err) => write!(f, "{err}"),
            ReadError::Decode { index, message } => {
                write!(f, "record {index} could not be decoded: {message}")
            }
        }
    }
}

impl ReadFailure for ReadError {
    fn is_not_found(&self) -> bool {
        matches!(self, ReadError::Store(err) if err.is_not_found())
    }
}

impl From<ReadError> for LaunchError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Store(err) => LaunchError::remote_service("read_event_log", err.to_string()),
            ReadError::Decode { index, message } => LaunchError::EventDecode { index, message },
        }
    }
}

/// Records decoded from the unread suffix of the log
struct ParsedSuffix {
    records: Vec<(EventLogRecord, Option<DomainEvent>)>,
    complete: bool,
}

/// Decode the records at index `consumed` and beyond.
///
/// Records before `consumed` are skipped without parsing. Blank lines are not
/// records. Scanning stops at the sentinel.
fn parse_suffix(bytes: &[u8], consumed: usize) -> Result<ParsedSuffix, ReadError> {
    let mut lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    // The piece after the last newline is either empty or still being written
    lines.pop();

    let mut parsed = ParsedSuffix {
        records: Vec::new(),
        complete: false,
    };

    let records = lines
        .into_iter()
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .enumerate()
        .skip(consumed);

    for (index, line) in records {
        let record: RemoteEventRecord =
            serde_json::from_slice(line).map_err(|err| ReadError::Decode {
                index,
                message: err.to_string(),
            })?;

        if record.is_sentinel() {
            parsed.complete = true;
            break;
        }
        if let RemoteEventRecord::Event(record) = record {
            let event = record.decode_event().map_err(|err| ReadError::Decode {
                index,
                message: err.to_string(),
            })?;
            parsed.records.push((record, event));
        }
    }

    Ok(parsed)
}

/// Reads new domain events for one (run, step) from its event log.
///
/// Single reader per log; the offset is owned by the caller and threaded
/// through [`EventStreamRecovery::read_new_events`].
pub struct EventStreamRecovery {
    store: Arc<dyn ArtifactStore>,
    events_path: String,
    retry: RetryPolicy,
    sink: Arc<dyn EventRecordSink>,
}

impl EventStreamRecovery {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        events_path: impl Into<String>,
        retry: RetryPolicy,
        sink: Arc<dyn EventRecordSink>,
    ) -> Self {
        Self {
            store,
            events_path: events_path.into(),
            retry,
            sink,
        }
    }

    pub fn events_path(&self) -> &str {
        &self.events_path
    }

    /// One read-and-forward cycle starting at `offset`.
    ///
    /// A log that does not exist yet yields an empty batch at the same offset.
    /// Transient read failures are retried; once the attempts are exhausted the
    /// last failure is returned and nothing from this cycle is forwarded.
    pub async fn read_new_events(&self, offset: EventLogOffset) -> LaunchResult<EventBatch> {
        let consumed = match offset {
            EventLogOffset::Complete => return Ok(EventBatch::empty(offset)),
            EventLogOffset::Consumed(n) => n,
        };

        let parsed = self
            .retry
            .execute("read_event_log", || async move {
                let bytes = self
                    .store
                    .read(&self.events_path)
                    .await
                    .map_err(ReadError::Store)?;
                parse_suffix(&bytes, consumed)
            })
            .await?;

        let Some(parsed) = parsed else {
            debug!(path = %self.events_path, "Event log not written yet");
            return Ok(EventBatch::empty(offset));
        };

        let mut events = Vec::with_capacity(parsed.records.len());
        let record_count = parsed.records.len();
        for (record, event) in parsed.records {
            self.sink.emit(&record, event.as_ref());
            if let Some(event) = event {
                events.push(event);
            }
        }

        let next = if parsed.complete {
            EventLogOffset::Complete
        } else {
            EventLogOffset::Consumed(consumed + record_count)
        };

        debug!(
            path = %self.events_path,
            records = record_count,
            events = events.len(),
            offset = next.as_raw(),
            "Event log read cycle finished"
        );

        Ok(EventBatch {
            events,
            offset: next,
        })
    }
}
