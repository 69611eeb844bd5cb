//! Error types for the update pipeline.

use crate::outcome::UpdateOutcome;
use release_feed::FeedError;

/// Top-level error type for an update run.
///
/// Stage functions return these; [`crate::Updater::run`] converts each one
/// into its [`UpdateOutcome`] and never lets it escape.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The project identifier cannot be turned into a feed address.
    #[error("invalid project reference: {0}")]
    InvalidProject(String),

    /// Feed or detail page could not be fetched or parsed.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Artifact download failed.
    #[error("download error: {0}")]
    Download(String),

    /// Archive extraction, binary relocation or data merge failed.
    #[error("install error: {0}")]
    Install(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl UpdateError {
    /// The terminal outcome this error produces.
    ///
    /// Plain I/O errors only occur while writing or unpacking artifacts, so
    /// they count as failed downloads.
    pub fn outcome(&self) -> UpdateOutcome {
        match self {
            Self::InvalidProject(_) | Self::Config(_) => UpdateOutcome::InvalidProjectReference,
            Self::Feed(_) => UpdateOutcome::FeedUnreachable,
            Self::Download(_) | Self::Install(_) | Self::Io(_) => UpdateOutcome::DownloadFailed,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpdateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = UpdateError::Download("connection reset".into());
        assert_eq!(err.to_string(), "download error: connection reset");

        let err = UpdateError::Feed(FeedError::Http("timed out".into()));
        assert_eq!(err.to_string(), "feed error: HTTP error: timed out");
    }

    #[test]
    fn errors_map_to_outcomes() {
        assert_eq!(
            UpdateError::InvalidProject("a/b".into()).outcome(),
            UpdateOutcome::InvalidProjectReference
        );
        assert_eq!(
            UpdateError::Feed(FeedError::Parse("no item".into())).outcome(),
            UpdateOutcome::FeedUnreachable
        );
        assert_eq!(
            UpdateError::Download("404".into()).outcome(),
            UpdateOutcome::DownloadFailed
        );
        assert_eq!(
            UpdateError::Install("bad zip".into()).outcome(),
            UpdateOutcome::DownloadFailed
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(UpdateError::from(io).outcome(), UpdateOutcome::DownloadFailed);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UpdateError>();
    }
}
