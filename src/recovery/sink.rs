//! Side channel for remote log records.
//!
//! Every record recovered from the event log is handed to a sink exactly once,
//! whether or not it carries a domain event. The default sink re-emits records
//! through `tracing` at the record's own level.

use crate::models::{DomainEvent, EventLogRecord, LogLevel};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

pub trait EventRecordSink: Send + Sync {
    fn emit(&self, record: &EventLogRecord, event: Option<&DomainEvent>);
}

/// Re-emits remote records as local `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecordSink;

impl EventRecordSink for TracingRecordSink {
    fn emit(&self, record: &EventLogRecord, event: Option<&DomainEvent>) {
        let event_type = event.map(|e| e.event_type.as_str()).unwrap_or("");
        match record.level {
            LogLevel::Trace => trace!(
                run_id = %record.run_id,
                step_key = %record.step_key,
                event_type = event_type,
                remote_timestamp = %record.timestamp,
                "{}", record.message
            ),
            LogLevel::Debug => debug!(
                run_id = %record.run_id,
                step_key = %record.step_key,
                event_type = event_type,
                remote_timestamp = %record.timestamp,
                "{}", record.message
            ),
            LogLevel::Info => info!(
                run_id = %record.run_id,
                step_key = %record.step_key,
                event_type = event_type,
                remote_timestamp = %record.timestamp,
                "{}", record.message
            ),
            LogLevel::Warn => warn!(
                run_id = %record.run_id,
                step_key = %record.step_key,
                event_type = event_type,
                remote_timestamp = %record.timestamp,
                "{}", record.message
            ),
            LogLevel::Error => error!(
                run_id = %record.run_id,
                step_key = %record.step_key,
                event_type = event_type,
                remote_timestamp = %record.timestamp,
                "{}", record.message
            ),
        }
    }
}

/// Keeps every forwarded record in memory
#[derive(Debug, Default)]
pub struct CollectingRecordSink {
    records: Mutex<Vec<EventLogRecord>>,
}

impl CollectingRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventLogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl EventRecordSink for CollectingRecordSink {
    fn emit(&self, record: &EventLogRecord, _event: Option<&DomainEvent>) {
        self.records.lock().push(record.clone());
    }
}
