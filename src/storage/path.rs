//! Deterministic artifact paths.
//!
//! Every artifact of a (run, step) pair lives under
//! `staging_prefix/run_id/escaped_step_key/file_name`. The same logical path has two
//! renderings: a store-native URI used by the launcher's store client, and a
//! local-mount path used by job code running on the cluster. They differ only in
//! their fixed prefix.

use crate::config::StagingConfig;
use std::fmt;

/// Replace characters that are unsafe in filesystem paths with `__`
pub fn escape_step_key(step_key: &str) -> String {
    step_key.replace(['[', ']'], "__")
}

/// Staging root plus the two rendering prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    staging_prefix: String,
    store_uri_prefix: String,
    mount_prefix: String,
}

impl PathLayout {
    pub fn new(
        staging_prefix: impl Into<String>,
        store_uri_prefix: impl Into<String>,
        mount_prefix: impl Into<String>,
    ) -> Self {
        Self {
            staging_prefix: staging_prefix.into(),
            store_uri_prefix: store_uri_prefix.into(),
            mount_prefix: mount_prefix.into(),
        }
    }

    pub fn from_config(staging: &StagingConfig) -> Self {
        Self::new(
            staging.prefix.clone(),
            staging.store_uri_prefix.clone(),
            staging.mount_prefix.clone(),
        )
    }

    /// Path of `file_name` for the given run and step
    pub fn artifact(&self, run_id: &str, step_key: &str, file_name: &str) -> RemoteArtifactPath {
        let base_name = file_name.rsplit('/').next().unwrap_or(file_name);
        let escaped_key = escape_step_key(step_key);

        let logical = [
            self.staging_prefix.trim_matches('/'),
            run_id,
            escaped_key.as_str(),
            base_name,
        ]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

        RemoteArtifactPath {
            logical,
            store_uri_prefix: self.store_uri_prefix.trim_end_matches('/').to_string(),
            mount_prefix: self.mount_prefix.trim_end_matches('/').to_string(),
        }
    }
}

/// One staged artifact, renderable for either side of the shared filesystem
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteArtifactPath {
    logical: String,
    store_uri_prefix: String,
    mount_prefix: String,
}

impl RemoteArtifactPath {
    /// Path relative to the root of the shared namespace
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Rendering used by the launcher's artifact store client
    pub fn store_uri(&self) -> String {
        format!("{}/{}", self.store_uri_prefix, self.logical)
    }

    /// Rendering used by code running on the cluster
    pub fn mount_path(&self) -> String {
        format!("{}/{}", self.mount_prefix, self.logical)
    }
}

impl fmt::Display for RemoteArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.store_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> PathLayout {
        PathLayout::new("/launcher_staging", "dbfs:/", "/dbfs/")
    }

    #[test]
    fn test_step_key_escaping() {
        assert_eq!(escape_step_key("a[0]"), "a__0__");
        assert_eq!(escape_step_key("plain"), "plain");
        assert_eq!(escape_step_key("fan[x][y]"), "fan__x____y__");
    }

    #[test]
    fn test_renderings_differ_only_in_prefix() {
        let path = layout().artifact("r", "a[0]", "x.bin");

        assert_eq!(path.logical(), "launcher_staging/r/a__0__/x.bin");
        assert_eq!(path.store_uri(), "dbfs:/launcher_staging/r/a__0__/x.bin");
        assert_eq!(path.mount_path(), "/dbfs/launcher_staging/r/a__0__/x.bin");

        let store_uri = path.store_uri();
        let mount_path = path.mount_path();
        let suffix = format!("/{}", path.logical());
        assert_eq!(store_uri.strip_suffix(&suffix), Some("dbfs:"));
        assert_eq!(mount_path.strip_suffix(&suffix), Some("/dbfs"));
    }

    #[test]
    fn test_paths_are_deterministic() {
        let first = layout().artifact("run", "step[1]", "events.jsonl");
        let second = layout().artifact("run", "step[1]", "events.jsonl");
        assert_eq!(first, second);
        assert_eq!(first.store_uri(), second.store_uri());
    }

    #[test]
    fn test_file_name_reduced_to_base_name() {
        let path = layout().artifact("run", "step", "/opt/launcher/step_main.py");
        assert_eq!(path.logical(), "launcher_staging/run/step/step_main.py");
    }

    #[test]
    fn test_root_staging_prefix() {
        let path = PathLayout::new("/", "dbfs:/", "/dbfs/").artifact("run", "s", "f");
        assert_eq!(path.store_uri(), "dbfs:/run/s/f");
    }
}
