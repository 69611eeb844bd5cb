//! Version policy: decide whether the newest feed entry warrants an update.
//!
//! Feed titles carry the version after a single literal `v`, as in
//! `CoolPlugin v2.0 Release`. Versions are compared as opaque strings
//! (case-insensitive equality), never ordered.

use crate::outcome::{OutcomeRecord, UpdateOutcome};

/// Separator between a release name and its version in feed titles.
pub const VERSION_SEPARATOR: char = 'v';

/// Decides whether an installed version should be replaced.
#[derive(Debug, Clone)]
pub struct VersionPolicy {
    no_update_tags: Vec<String>,
    author: Option<String>,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self::new(vec!["-DEV".to_owned(), "-PRE".to_owned()])
    }
}

impl VersionPolicy {
    /// Policy with the given no-update tags.
    pub fn new(no_update_tags: Vec<String>) -> Self {
        Self {
            no_update_tags,
            author: None,
        }
    }

    /// Name of the component's author, quoted when the feed is misconfigured.
    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// Tags that suppress updating.
    pub fn no_update_tags(&self) -> &[String] {
        &self.no_update_tags
    }

    /// Whether the installed version carries a no-update tag.
    pub fn has_tag(&self, installed_version: &str) -> bool {
        self.no_update_tags
            .iter()
            .any(|tag| installed_version.contains(tag.as_str()))
    }

    /// Decide whether to update from `installed_version` to the release named
    /// `latest_title`.
    ///
    /// With `check_enabled` false the newest file is always accepted and the
    /// record is left alone. Otherwise a title without exactly one version
    /// separator records [`UpdateOutcome::NoVersionFound`], and a tagged or
    /// already-current installed version records
    /// [`UpdateOutcome::NoUpdateAvailable`]; both return `false`.
    pub fn should_update(
        &self,
        installed_version: &str,
        latest_title: &str,
        check_enabled: bool,
        record: &mut OutcomeRecord,
    ) -> bool {
        if !check_enabled {
            return true;
        }

        let Some(remote_version) = extract_remote_version(latest_title) else {
            tracing::warn!("The author of this component has misconfigured their auto-update system");
            tracing::warn!(
                title = latest_title,
                "Uploaded files should contain the version number, separated from the name by a 'v', such as Name v1.0"
            );
            match &self.author {
                Some(author) => tracing::warn!("Please notify the author ({author}) of this error."),
                None => tracing::warn!("Please notify the author of this error."),
            }
            record.record(UpdateOutcome::NoVersionFound);
            return false;
        };

        if self.has_tag(installed_version) {
            tracing::info!(installed_version, "installed build is tagged to skip updates");
            record.record(UpdateOutcome::NoUpdateAvailable);
            return false;
        }
        if installed_version.eq_ignore_ascii_case(remote_version) {
            tracing::info!(installed_version, "already on the newest release");
            record.record(UpdateOutcome::NoUpdateAvailable);
            return false;
        }

        tracing::info!(installed_version, remote_version, "newer release available");
        true
    }
}

/// Extract the version from a feed title.
///
/// The title must split on `v` into exactly two parts once trailing empty
/// parts are dropped; the version is the second part up to the first space.
/// Returns `None` otherwise, including for titles with more than one `v`
/// inside them.
pub fn extract_remote_version(title: &str) -> Option<&str> {
    let mut parts: Vec<&str> = title.split(VERSION_SEPARATOR).collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    match parts.as_slice() {
        [_, rest] => rest.split(' ').next(),
        _ => None,
    }
}
