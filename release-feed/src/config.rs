//! Feed configuration with sensible defaults.
//!
//! [`FeedConfig`] controls where project feeds live, how the download entry
//! on a file detail page is recognised, and how requests are sent.

use crate::error::FeedError;
use url::Url;

/// Default root under which project feeds are published.
pub const DEFAULT_FEED_BASE: &str = "http://dev.bukkit.org/server-mods/";

/// Marker identifying the list item that holds the download anchor.
pub const DEFAULT_DOWNLOAD_MARKER: &str = "<li class=\"user-action user-action-download\">";

/// File name of a project's release feed below its project directory.
pub const FEED_FILE_NAME: &str = "files.rss";

/// Configuration for reading release feeds and detail pages.
///
/// Use [`Default::default()`] for the standard feed host, or override fields
/// for mirrors and tests.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL that project identifiers are appended to.
    pub feed_base: String,
    /// Exact substring that marks the download line on a detail page.
    pub download_marker: String,
    /// Custom User-Agent string. If `None`, the crate's own name and version are sent.
    pub user_agent: Option<String>,
    /// Connect and read timeout in seconds. `None` keeps a 30 second connect
    /// timeout and leaves reads unbounded.
    pub timeout_seconds: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_base: DEFAULT_FEED_BASE.to_owned(),
            download_marker: DEFAULT_DOWNLOAD_MARKER.to_owned(),
            user_agent: None,
            timeout_seconds: None,
        }
    }
}

impl FeedConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `feed_base` must parse as an absolute URL
    /// - `download_marker` must not be empty
    /// - `timeout_seconds`, when set, must be greater than 0
    pub fn validate(&self) -> Result<(), FeedError> {
        if let Err(e) = Url::parse(&self.feed_base) {
            return Err(FeedError::Config(format!(
                "feed_base '{}' is not a valid URL: {e}",
                self.feed_base
            )));
        }
        if self.download_marker.trim().is_empty() {
            return Err(FeedError::Config(
                "download_marker must not be empty".into(),
            ));
        }
        if self.timeout_seconds == Some(0) {
            return Err(FeedError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Builds the feed address for a project: `<feed_base>/<project_id>/files.rss`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] if the identifier is empty, is not a
    /// single path segment, or does not produce a well-formed URL.
    pub fn feed_url(&self, project_id: &str) -> Result<Url, FeedError> {
        if project_id.is_empty() {
            return Err(FeedError::Config("project identifier is empty".into()));
        }
        if project_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '\\'))
        {
            return Err(FeedError::Config(format!(
                "project identifier '{project_id}' is not a single path segment"
            )));
        }
        if project_id == "." || project_id == ".." {
            return Err(FeedError::Config(format!(
                "project identifier '{project_id}' is not a project name"
            )));
        }

        let base = self.feed_base.trim_end_matches('/');
        let raw = format!("{base}/{project_id}/{FEED_FILE_NAME}");
        Url::parse(&raw).map_err(|e| FeedError::Config(format!("invalid feed URL '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_standard_values() {
        let config = FeedConfig::default();
        assert_eq!(config.feed_base, DEFAULT_FEED_BASE);
        assert_eq!(config.download_marker, DEFAULT_DOWNLOAD_MARKER);
        assert!(config.user_agent.is_none());
        assert!(config.timeout_seconds.is_none());
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(FeedConfig::default().validate().is_ok());
    }

    #[test]
    fn relative_feed_base_rejected() {
        let config = FeedConfig {
            feed_base: "server-mods/".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("feed_base"));
    }

    #[test]
    fn empty_marker_rejected() {
        let config = FeedConfig {
            download_marker: "  ".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("download_marker"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = FeedConfig {
            timeout_seconds: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn feed_url_appends_project_and_file() {
        let config = FeedConfig::default();
        let url = config.feed_url("coolplugin").unwrap();
        assert_eq!(
            url.as_str(),
            "http://dev.bukkit.org/server-mods/coolplugin/files.rss"
        );
    }

    #[test]
    fn feed_url_tolerates_base_without_trailing_slash() {
        let config = FeedConfig {
            feed_base: "http://127.0.0.1:8080/projects".into(),
            ..Default::default()
        };
        let url = config.feed_url("abc").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/projects/abc/files.rss");
    }

    #[test]
    fn feed_url_rejects_empty_project() {
        assert!(FeedConfig::default().feed_url("").is_err());
    }

    #[test]
    fn feed_url_rejects_multi_segment_project() {
        let config = FeedConfig::default();
        assert!(config.feed_url("a/b").is_err());
        assert!(config.feed_url("a b").is_err());
        assert!(config.feed_url("a?b").is_err());
        assert!(config.feed_url("..").is_err());
    }

    #[test]
    fn feed_url_rejects_broken_base() {
        let config = FeedConfig {
            feed_base: "not a url".into(),
            ..Default::default()
        };
        assert!(config.feed_url("abc").is_err());
    }
}
