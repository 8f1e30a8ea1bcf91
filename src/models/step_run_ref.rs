use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable description of the step a launch executes remotely.
///
/// Created once per launch attempt by the caller, serialized into the staging
/// area, and read back by the remote entry point. The launcher never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRunReference {
    pub run_id: String,
    pub step_key: String,
    /// Resolved step inputs, keyed by input name
    #[serde(default)]
    pub inputs: BTreeMap<String, serde_json::Value>,
    /// Number of attempts already made for this step within the run
    #[serde(default)]
    pub prior_attempts_count: u32,
    /// Where the remote side finds the step's code once the zip is unpacked
    #[serde(default)]
    pub code_location: Option<String>,
}

impl StepRunReference {
    pub fn new(run_id: impl Into<String>, step_key: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            step_key: step_key.into(),
            inputs: BTreeMap::new(),
            prior_attempts_count: 0,
            code_location: None,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn with_prior_attempts(mut self, prior_attempts_count: u32) -> Self {
        self.prior_attempts_count = prior_attempts_count;
        self
    }

    pub fn with_code_location(mut self, code_location: impl Into<String>) -> Self {
        self.code_location = Some(code_location.into());
        self
    }

    /// Whether this launch is a retry of an earlier attempt
    pub fn is_retry(&self) -> bool {
        self.prior_attempts_count > 0
    }
}
