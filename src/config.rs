//! Configuration types for the update pipeline.

use crate::error::{Result, UpdateError};
use release_feed::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for an update run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Project identifier appended to `feed_base` (the project's slug).
    pub project_id: String,
    /// Root under which project feeds are published.
    pub feed_base: String,
    /// Compare the installed version with the feed before downloading.
    ///
    /// When `false` the newest file is always fetched.
    pub check_version: bool,
    /// Version substrings that forbid updating the build that carries them.
    pub no_update_tags: Vec<String>,
    /// Exact substring marking the download line on a detail page.
    pub download_marker: String,
    /// File extension of archives that get unpacked after download.
    pub archive_extension: String,
    /// File extension of installable binaries inside an archive.
    pub binary_extension: String,
    /// Copy buffer size in bytes for downloads and extraction.
    pub chunk_size: usize,
    /// Custom User-Agent (None = crate default).
    pub user_agent: Option<String>,
    /// Connect/read timeout in seconds (None = 30 s connect timeout, unbounded reads).
    pub timeout_seconds: Option<u64>,
    /// Staging and installation directories.
    pub paths: StagingPaths,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            feed_base: release_feed::config::DEFAULT_FEED_BASE.to_owned(),
            check_version: true,
            no_update_tags: vec!["-DEV".to_owned(), "-PRE".to_owned()],
            download_marker: release_feed::config::DEFAULT_DOWNLOAD_MARKER.to_owned(),
            archive_extension: ".zip".to_owned(),
            binary_extension: ".jar".to_owned(),
            chunk_size: 1024,
            user_agent: None,
            timeout_seconds: None,
            paths: StagingPaths::default(),
        }
    }
}

/// Where update artifacts are staged and where the live installation lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingPaths {
    /// Scratch space for downloads and binaries awaiting the next restart.
    pub download_directory: PathBuf,
    /// Live installation tree; its direct children are installed components.
    pub install_root: PathBuf,
}

impl Default for StagingPaths {
    fn default() -> Self {
        Self {
            download_directory: PathBuf::from("plugins").join("update"),
            install_root: PathBuf::from("plugins"),
        }
    }
}

impl StagingPaths {
    /// Paths with an explicit staging directory and install root.
    pub fn new(download_directory: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            download_directory: download_directory.into(),
            install_root: install_root.into(),
        }
    }
}

impl UpdaterConfig {
    /// Default configuration for a project.
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `chunk_size` must be greater than 0
    /// - both extensions must start with `.` and have a name after it
    /// - the staging directory must differ from the install root
    /// - feed settings must pass [`FeedConfig::validate`]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(UpdateError::Config(
                "chunk_size must be greater than 0".into(),
            ));
        }
        for (field, ext) in [
            ("archive_extension", &self.archive_extension),
            ("binary_extension", &self.binary_extension),
        ] {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(UpdateError::Config(format!(
                    "{field} must look like '.ext', got '{ext}'"
                )));
            }
        }
        if self.paths.download_directory == self.paths.install_root {
            return Err(UpdateError::Config(
                "download_directory and install_root must be different directories".into(),
            ));
        }
        self.feed_config()
            .validate()
            .map_err(|e| UpdateError::Config(e.to_string()))
    }

    /// The feed-side subset of this configuration.
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            feed_base: self.feed_base.clone(),
            download_marker: self.download_marker.clone(),
            user_agent: self.user_agent.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| UpdateError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpdateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = UpdaterConfig::for_project("coolplugin");
        assert!(config.validate().is_ok());
        assert!(config.check_version);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.no_update_tags, vec!["-DEV", "-PRE"]);
        assert_eq!(config.archive_extension, ".zip");
        assert_eq!(config.binary_extension, ".jar");
    }

    #[test]
    fn default_paths_are_distinct() {
        let paths = StagingPaths::default();
        assert_ne!(paths.download_directory, paths.install_root);
        assert!(paths.download_directory.starts_with(&paths.install_root));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let config = UpdaterConfig {
            chunk_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn bare_extension_rejected() {
        let config = UpdaterConfig {
            archive_extension: "zip".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("archive_extension"));

        let config = UpdaterConfig {
            binary_extension: ".".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn same_staging_and_install_rejected() {
        let config = UpdaterConfig {
            paths: StagingPaths::new("plugins", "plugins"),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("install_root"));
    }

    #[test]
    fn invalid_feed_settings_rejected() {
        let config = UpdaterConfig {
            timeout_seconds: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, UpdateError::Config(_)));
    }

    #[test]
    fn feed_config_carries_feed_fields() {
        let config = UpdaterConfig {
            feed_base: "http://mirror.example/".into(),
            user_agent: Some("Host/2.0".into()),
            timeout_seconds: Some(30),
            ..Default::default()
        };
        let feed = config.feed_config();
        assert_eq!(feed.feed_base, "http://mirror.example/");
        assert_eq!(feed.user_agent.as_deref(), Some("Host/2.0"));
        assert_eq!(feed.timeout_seconds, Some(30));
        assert_eq!(feed.download_marker, config.download_marker);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("updater.toml");

        let mut config = UpdaterConfig::for_project("coolplugin");
        config.check_version = false;
        config.no_update_tags = vec!["-SNAPSHOT".into()];
        config.paths = StagingPaths::new("srv/plugins/update", "srv/plugins");

        config.save_to_file(&path).unwrap();
        assert!(path.exists());

        let loaded = UpdaterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.project_id, "coolplugin");
        assert!(!loaded.check_version);
        assert_eq!(loaded.no_update_tags, vec!["-SNAPSHOT"]);
        assert_eq!(loaded.paths, config.paths);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: UpdaterConfig = toml::from_str(
            r#"
project_id = "coolplugin"

[paths]
install_root = "/srv/mc/plugins"
"#,
        )
        .unwrap();
        assert_eq!(config.project_id, "coolplugin");
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.paths.install_root, PathBuf::from("/srv/mc/plugins"));
        assert_eq!(
            config.paths.download_directory,
            StagingPaths::default().download_directory
        );
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = UpdaterConfig::from_file(Path::new("/nonexistent/path/updater.toml"));
        assert!(matches!(result, Err(UpdateError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = UpdaterConfig::from_file(&path);
        assert!(matches!(result, Err(UpdateError::Config(_))));
    }
}
