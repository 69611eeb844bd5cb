//! # release-feed
//!
//! Blocking access to a project's release feed and its file detail pages.
//!
//! ## Design
//!
//! - The feed is read as an XML event stream; reading stops at the end of
//!   the first `item`, so only the newest release is ever parsed
//! - Detail pages are scanned line by line for a fixed download marker and
//!   the marker line is parsed as an HTML fragment
//! - One [`HttpClient`] is shared by every request of an update run
//! - No retries: a failed request is reported once and left to the caller

pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod locator;

pub use config::FeedConfig;
pub use error::{FeedError, Result};
pub use feed::FeedEntry;
pub use http::HttpClient;

/// Read the newest entry of a project's release feed.
///
/// Builds the feed URL from `config` and `project_id`, fetches it and
/// returns the first item.
///
/// # Errors
///
/// Returns [`FeedError::Config`] if the configuration or project identifier
/// is invalid, otherwise any error from [`feed::read_latest`].
///
/// # Examples
///
/// ```no_run
/// # fn example() -> release_feed::Result<()> {
/// let config = release_feed::FeedConfig::default();
/// let client = release_feed::HttpClient::new(&config);
/// let entry = release_feed::latest_entry(&client, &config, "coolplugin")?;
/// println!("{} -> {}", entry.title, entry.link);
/// # Ok(())
/// # }
/// ```
pub fn latest_entry(client: &HttpClient, config: &FeedConfig, project_id: &str) -> Result<FeedEntry> {
    config.validate()?;
    let url = config.feed_url(project_id)?;
    feed::read_latest(client, url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_entry_rejects_invalid_config() {
        let config = FeedConfig {
            download_marker: String::new(),
            ..Default::default()
        };
        let client = HttpClient::new(&config);
        let err = latest_entry(&client, &config, "coolplugin").unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[test]
    fn latest_entry_rejects_bad_project() {
        let config = FeedConfig::default();
        let client = HttpClient::new(&config);
        let err = latest_entry(&client, &config, "no/such").unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }
}
