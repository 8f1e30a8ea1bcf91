pub mod event_record;
pub mod remote_config;
pub mod step_run_ref;

// Re-export core models for easy access
pub use event_record::{DomainEvent, EventLogRecord, LogLevel, RemoteEventRecord};
pub use remote_config::{RemoteConfig, SecretBinding, StorageBinding};
pub use step_run_ref::StepRunReference;
