//! Builders for event logs and launcher fixtures.

use remote_step_launcher::constants::artifacts;
use remote_step_launcher::{
    DomainEvent, EventLogRecord, LauncherConfig, LogLevel, PathLayout, RemoteEventRecord,
    StepRunReference, StorageBinding,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const RUN_ID: &str = "run-42";
pub const STEP_KEY: &str = "transform[0]";

/// Newline-delimited event log content, built the way the remote writer lays it out
#[derive(Debug, Default, Clone)]
pub struct EventLogBuilder {
    lines: Vec<String>,
}

impl EventLogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record carrying a domain event whose message is `message`
    pub fn event(mut self, message: &str) -> Self {
        let event = DomainEvent::new("STEP_OUTPUT", STEP_KEY).with_message(message);
        let record = EventLogRecord::new(RUN_ID, STEP_KEY, LogLevel::Info, message)
            .with_event(&event)
            .unwrap();
        self.lines
            .push(serde_json::to_string(&RemoteEventRecord::Event(record)).unwrap());
        self
    }

    pub fn events(self, messages: &[&str]) -> Self {
        messages.iter().fold(self, |log, message| log.event(message))
    }

    /// A record with no embedded domain event
    pub fn plain(mut self, message: &str) -> Self {
        let record = EventLogRecord::new(RUN_ID, STEP_KEY, LogLevel::Debug, message);
        self.lines
            .push(serde_json::to_string(&RemoteEventRecord::Event(record)).unwrap());
        self
    }

    pub fn sentinel(mut self) -> Self {
        self.lines
            .push(serde_json::to_string(&RemoteEventRecord::LogsComplete).unwrap());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        content.into_bytes()
    }
}

/// Messages of the given events, in order
pub fn messages(events: &[DomainEvent]) -> Vec<String> {
    events.iter().filter_map(|e| e.message.clone()).collect()
}

pub fn step_run_ref() -> StepRunReference {
    StepRunReference::new(RUN_ID, STEP_KEY)
}

/// Local entry point and job package for a launch
pub struct LaunchFixture {
    pub dir: TempDir,
    pub config: LauncherConfig,
}

impl LaunchFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let entry_point = dir.path().join("step_main.py");
        fs::write(&entry_point, "import sys\nprint(sys.argv)\n").unwrap();
        let package: PathBuf = dir.path().join("jobs");
        fs::create_dir_all(package.join("etl")).unwrap();
        fs::write(package.join("etl/transform.py"), "def transform(): pass\n").unwrap();

        let storage = StorageBinding::S3 {
            secret_scope: "launcher".to_string(),
            access_key_key: "aws-access".to_string(),
            secret_key_key: "aws-secret".to_string(),
        };
        let mut config =
            LauncherConfig::new("https://cluster.example.net", storage, package, entry_point);
        config.polling.poll_interval_ms = 2_500;
        config.polling.max_completion_wait_time_seconds = 60;

        Self { dir, config }
    }

    pub fn with_max_wait_seconds(mut self, seconds: u64) -> Self {
        self.config.polling.max_completion_wait_time_seconds = seconds;
        self
    }

    pub fn with_wait_for_logs(mut self) -> Self {
        self.config.wait_for_logs = true;
        self
    }

    /// Store URI of the step's event log under this fixture's layout
    pub fn events_uri(&self) -> String {
        PathLayout::from_config(&self.config.staging)
            .artifact(RUN_ID, STEP_KEY, artifacts::EVENTS_FILE_NAME)
            .store_uri()
    }
}
