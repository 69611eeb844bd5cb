//! Update orchestration.
//!
//! [`Updater::run`] drives one update from start to finish:
//! feed → version policy → download link → download → archive install.
//! Every stage reports failure through an [`UpdateError`] that is logged,
//! converted into an [`UpdateOutcome`] and recorded; the first terminal
//! outcome ends the run. Nothing is retried.

use crate::config::UpdaterConfig;
use crate::download::{Downloader, artifact_file_name};
use crate::error::UpdateError;
use crate::install::ArchiveInstaller;
use crate::outcome::{OutcomeRecord, UpdateOutcome};
use crate::version::VersionPolicy;
use release_feed::{FeedEntry, HttpClient, feed, locator};
use std::path::PathBuf;

/// The locally installed component being kept up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledComponent {
    /// File name of the running component inside the install root (e.g. `CoolPlugin.jar`).
    pub file_name: String,
    /// Installed version string.
    pub version: String,
    /// Author to name in warnings about a misconfigured feed.
    pub author: Option<String>,
}

impl InstalledComponent {
    /// Component with a file name and version and no known author.
    pub fn new(file_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            version: version.into(),
            author: None,
        }
    }

    /// Set the author quoted in misconfiguration warnings.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Runs the update pipeline for one installed component.
///
/// The pipeline blocks the calling thread until it finishes; hosts with a
/// responsive main loop should call [`Updater::run`] from a worker thread.
#[derive(Debug, Clone)]
pub struct Updater {
    config: UpdaterConfig,
    component: InstalledComponent,
    client: HttpClient,
}

impl Updater {
    /// Updater for `component` using `config`.
    pub fn new(config: UpdaterConfig, component: InstalledComponent) -> Self {
        let client = HttpClient::new(&config.feed_config());
        Self {
            config,
            component,
            client,
        }
    }

    /// The configuration this updater runs with.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Run the whole pipeline and return its outcome.
    pub fn run(&self) -> UpdateOutcome {
        let mut record = OutcomeRecord::new();
        self.run_stages(&mut record);
        tracing::info!(
            project = %self.config.project_id,
            outcome = %record.outcome(),
            "update run finished"
        );
        record.outcome()
    }

    fn run_stages(&self, record: &mut OutcomeRecord) {
        if let Err(e) = self.config.validate() {
            tracing::warn!("The auto-update system of this component is misconfigured: {e}");
            record.record(e.outcome());
            return;
        }

        let feed_url = match self.config.feed_config().feed_url(&self.config.project_id) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("The author of this component has misconfigured their auto-update system");
                tracing::warn!(
                    "The project identifier added ('{}') is invalid: {e}",
                    self.config.project_id
                );
                record.record(UpdateError::InvalidProject(e.to_string()).outcome());
                return;
            }
        };

        let Some(entry) = self.read_feed(feed_url.as_str(), record) else {
            return;
        };

        let policy = VersionPolicy::new(self.config.no_update_tags.clone())
            .with_author(self.component.author.clone());
        if !policy.should_update(
            &self.component.version,
            &entry.title,
            self.config.check_version,
            record,
        ) {
            return;
        }

        let Some(link) = self.locate_artifact(&entry, record) else {
            return;
        };

        let Some(downloaded) = self.download(&link, record) else {
            return;
        };

        let installer = ArchiveInstaller::from_config(&self.config);
        if installer.is_archive(&downloaded) {
            if let Err(e) = installer.install(&downloaded) {
                fail(record, e, "The updater tried to unpack a new update, but was unsuccessful.");
            }
        } else {
            tracing::info!(path = %downloaded.display(), "update staged for next restart");
        }
    }

    fn read_feed(&self, url: &str, record: &mut OutcomeRecord) -> Option<FeedEntry> {
        match feed::read_latest(&self.client, url) {
            Ok(entry) => Some(entry),
            Err(e) => {
                fail(
                    record,
                    e.into(),
                    "The updater tried to read the project feed, but was unsuccessful.",
                );
                None
            }
        }
    }

    fn locate_artifact(&self, entry: &FeedEntry, record: &mut OutcomeRecord) -> Option<String> {
        match locator::resolve_download_link(&self.client, &entry.link, &self.config.download_marker) {
            Ok(Some(link)) => Some(link),
            Ok(None) => {
                tracing::warn!(
                    detail_page = %entry.link,
                    "The newest release has no download link; nothing was downloaded."
                );
                None
            }
            Err(e) => {
                fail(
                    record,
                    e.into(),
                    "The updater tried to contact the release page, but was unsuccessful.",
                );
                None
            }
        }
    }

    fn download(&self, link: &str, record: &mut OutcomeRecord) -> Option<PathBuf> {
        let file_name = artifact_file_name(
            link,
            &self.component.file_name,
            &self.config.archive_extension,
        );
        let downloader = Downloader::new(
            self.client.clone(),
            self.config.chunk_size,
            self.config.archive_extension.clone(),
        );
        match downloader.fetch(link, &self.config.paths.download_directory, &file_name) {
            Ok(path) => Some(path),
            Err(e) => {
                fail(
                    record,
                    e,
                    "The updater tried to download a new update, but was unsuccessful.",
                );
                None
            }
        }
    }
}

fn fail(record: &mut OutcomeRecord, err: UpdateError, message: &str) {
    tracing::warn!(error = %err, "{message}");
    record.record(err.outcome());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StagingPaths;

    fn offline_config(project_id: &str) -> UpdaterConfig {
        UpdaterConfig {
            project_id: project_id.to_owned(),
            // Closed loopback port: any request fails fast.
            feed_base: "http://127.0.0.1:9/server-mods/".to_owned(),
            timeout_seconds: Some(2),
            paths: StagingPaths::new("target/never-used/update", "target/never-used"),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_project_reference() {
        let updater = Updater::new(offline_config("not/a/slug"), InstalledComponent::new("a.jar", "1.0"));
        assert_eq!(updater.run(), UpdateOutcome::InvalidProjectReference);
    }

    #[test]
    fn empty_project_reference() {
        let updater = Updater::new(offline_config(""), InstalledComponent::new("a.jar", "1.0"));
        assert_eq!(updater.run(), UpdateOutcome::InvalidProjectReference);
    }

    #[test]
    fn invalid_config_stops_before_network() {
        let mut config = offline_config("coolplugin");
        config.chunk_size = 0;
        let updater = Updater::new(config, InstalledComponent::new("a.jar", "1.0"));
        assert_eq!(updater.run(), UpdateOutcome::InvalidProjectReference);
    }

    #[test]
    fn unreachable_feed() {
        let updater = Updater::new(offline_config("coolplugin"), InstalledComponent::new("a.jar", "1.0"));
        assert_eq!(updater.run(), UpdateOutcome::FeedUnreachable);
    }

    #[test]
    fn component_builder_sets_author() {
        let component = InstalledComponent::new("CoolPlugin.jar", "1.0").with_author("H31IX");
        assert_eq!(component.author.as_deref(), Some("H31IX"));
        assert_eq!(component.file_name, "CoolPlugin.jar");
    }
}
