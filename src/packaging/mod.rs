//! # Step Packaging
//!
//! Stages everything the remote side needs for one step: the entry point, a zipped
//! snapshot of the job package, the serialized [`StepRunReference`], and the
//! serialized [`RemoteConfig`]. Uploads happen in that order and the first failure
//! aborts the launch before anything is submitted.

pub mod code_zip;

use crate::constants::artifacts;
use crate::error::{LaunchError, LaunchResult};
use crate::models::{RemoteConfig, StepRunReference};
use crate::storage::{ArtifactStore, PathLayout, RemoteArtifactPath};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub use code_zip::build_code_zip;

/// Paths of every artifact belonging to one (run, step) pair.
///
/// A pure function of the layout, run id, step key, and entry point name, so it
/// can be recomputed at any time instead of stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    pub entry_point: RemoteArtifactPath,
    pub code_zip: RemoteArtifactPath,
    pub step_run_ref: RemoteArtifactPath,
    pub remote_config: RemoteArtifactPath,
    /// Written by the remote side, never by the packager
    pub events: RemoteArtifactPath,
}

impl StagedArtifacts {
    pub fn for_step(
        layout: &PathLayout,
        run_id: &str,
        step_key: &str,
        entry_point_name: &str,
    ) -> Self {
        Self {
            entry_point: layout.artifact(run_id, step_key, entry_point_name),
            code_zip: layout.artifact(run_id, step_key, artifacts::CODE_ZIP_NAME),
            step_run_ref: layout.artifact(run_id, step_key, artifacts::STEP_RUN_REF_FILE_NAME),
            remote_config: layout.artifact(run_id, step_key, artifacts::REMOTE_CONFIG_FILE_NAME),
            events: layout.artifact(run_id, step_key, artifacts::EVENTS_FILE_NAME),
        }
    }
}

pub struct StepPackager {
    store: Arc<dyn ArtifactStore>,
    layout: PathLayout,
    entry_point_path: PathBuf,
    code_root: PathBuf,
}

impl StepPackager {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        layout: PathLayout,
        entry_point_path: impl Into<PathBuf>,
        code_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            layout,
            entry_point_path: entry_point_path.into(),
            code_root: code_root.into(),
        }
    }

    fn entry_point_name(&self) -> LaunchResult<&str> {
        self.entry_point_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                LaunchError::packaging(format!(
                    "entry point path has no file name: {}",
                    self.entry_point_path.display()
                ))
            })
    }

    /// Artifact paths for a step without uploading anything
    pub fn artifacts_for(&self, step_run_ref: &StepRunReference) -> LaunchResult<StagedArtifacts> {
        Ok(StagedArtifacts::for_step(
            &self.layout,
            &step_run_ref.run_id,
            &step_run_ref.step_key,
            self.entry_point_name()?,
        ))
    }

    /// Upload all four artifacts for a step
    pub async fn package(
        &self,
        step_run_ref: &StepRunReference,
        remote_config: &RemoteConfig,
    ) -> LaunchResult<StagedArtifacts> {
        let staged = self.artifacts_for(step_run_ref)?;

        info!(step_key = %step_run_ref.step_key, "Uploading entry point");
        let entry_point = tokio::fs::read(&self.entry_point_path).await.map_err(|e| {
            LaunchError::packaging(format!(
                "failed to read entry point {}: {e}",
                self.entry_point_path.display()
            ))
        })?;
        self.upload(&staged.entry_point, entry_point).await?;

        info!(step_key = %step_run_ref.step_key, "Uploading job package");
        let code_root = self.code_root.clone();
        let code_zip = tokio::task::spawn_blocking(move || build_code_zip(&code_root))
            .await
            .map_err(|e| LaunchError::packaging(format!("code zip task failed: {e}")))??;
        self.upload(&staged.code_zip, code_zip).await?;

        info!(step_key = %step_run_ref.step_key, "Uploading step run reference");
        self.upload(&staged.step_run_ref, serde_json::to_vec(step_run_ref)?)
            .await?;

        info!(
            step_key = %step_run_ref.step_key,
            storage = remote_config.storage.kind(),
            secrets = remote_config.secrets.len(),
            "Uploading remote configuration"
        );
        self.upload(&staged.remote_config, serde_json::to_vec(remote_config)?)
            .await?;

        Ok(staged)
    }

    async fn upload(&self, path: &RemoteArtifactPath, bytes: Vec<u8>) -> LaunchResult<()> {
        let uri = path.store_uri();
        let size = bytes.len();
        self.store
            .write(&uri, bytes)
            .await
            .map_err(|e| LaunchError::artifact_upload(&uri, e.to_string()))?;
        debug!(path = %uri, bytes = size, "Artifact uploaded");
        Ok(())
    }
}
