//! Error types for the release-feed crate.
//!
//! Every variant carries a human-readable message. Callers in the update
//! pipeline collapse all of them into a single "feed unreachable" outcome,
//! so the split exists for logging and tests rather than for recovery.

/// Errors that can occur while reading a release feed or a file detail page.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The request could not be sent or the server answered with an error status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body could not be parsed as the expected document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Reading the response body failed part way through.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid feed configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for release-feed results.
pub type Result<T> = std::result::Result<T, FeedError>;
