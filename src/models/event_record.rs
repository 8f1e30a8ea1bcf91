//! # Remote Event Records
//!
//! The remote side appends one [`RemoteEventRecord`] per line to the step's event
//! log (newline-delimited JSON). A record is either a log entry that may embed a
//! serialized [`DomainEvent`], or the completion sentinel written once no further
//! records will follow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry in the append-only remote event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteEventRecord {
    /// A log record, optionally carrying a domain event
    Event(EventLogRecord),
    /// Completion sentinel: nothing is appended after this record
    LogsComplete,
}

impl RemoteEventRecord {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, RemoteEventRecord::LogsComplete)
    }
}

/// Log severity carried by a remote record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Log entry written by the remote step process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogRecord {
    pub run_id: String,
    pub step_key: String,
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Serialized [`DomainEvent`]; decoded only when the record is forwarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl EventLogRecord {
    pub fn new(
        run_id: impl Into<String>,
        step_key: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_key: step_key.into(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            event: None,
        }
    }

    /// Attach a domain event, serialized the way the remote side embeds it
    pub fn with_event(mut self, event: &DomainEvent) -> Result<Self, serde_json::Error> {
        self.event = Some(serde_json::to_string(event)?);
        Ok(self)
    }

    /// Decode the embedded domain event, if any
    pub fn decode_event(&self) -> Result<Option<DomainEvent>, serde_json::Error> {
        self.event
            .as_deref()
            .map(serde_json::from_str::<DomainEvent>)
            .transpose()
    }
}

/// Domain event produced by the remote step and forwarded to the caller.
///
/// The launcher treats the payload as opaque; only the type tag and step key are
/// read, for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_type: String,
    pub step_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>, step_key: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            step_key: step_key.into(),
            message: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
