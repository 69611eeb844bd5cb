//! Terminal outcome of an update run.
//!
//! Tracks the single result an update run reports. The record starts at
//! [`UpdateOutcome::Success`] and keeps the first non-success outcome it is
//! given; later stages never overwrite an earlier failure.

use serde::{Deserialize, Serialize};

/// Result of an update run, as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// An update was staged for the next restart, or nothing needed doing.
    #[default]
    Success,
    /// The installed version is current or tagged to skip updates.
    NoUpdateAvailable,
    /// An update was found but could not be downloaded or unpacked.
    DownloadFailed,
    /// The feed or detail page could not be reached or parsed.
    FeedUnreachable,
    /// The newest feed entry's title has no `v<version>` token.
    NoVersionFound,
    /// The project identifier does not produce a valid feed address.
    InvalidProjectReference,
}

impl UpdateOutcome {
    /// Whether this outcome reports a failure.
    ///
    /// `NoUpdateAvailable` is a normal terminal state, not a failure.
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Success | Self::NoUpdateAvailable)
    }
}

impl std::fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::NoUpdateAvailable => write!(f, "no update available"),
            Self::DownloadFailed => write!(f, "download failed"),
            Self::FeedUnreachable => write!(f, "feed unreachable"),
            Self::NoVersionFound => write!(f, "no version found"),
            Self::InvalidProjectReference => write!(f, "invalid project reference"),
        }
    }
}

/// Outcome accumulator threaded through the pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeRecord {
    outcome: UpdateOutcome,
}

impl OutcomeRecord {
    /// A fresh record holding [`UpdateOutcome::Success`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal outcome. Only the first non-success outcome sticks.
    pub fn record(&mut self, outcome: UpdateOutcome) {
        if self.outcome == UpdateOutcome::Success {
            self.outcome = outcome;
        } else if outcome != self.outcome {
            tracing::trace!(kept = %self.outcome, ignored = %outcome, "outcome already set");
        }
    }

    /// The outcome recorded so far.
    pub fn outcome(&self) -> UpdateOutcome {
        self.outcome
    }

    /// Whether a stage has already ended the run.
    pub fn is_terminal(&self) -> bool {
        self.outcome != UpdateOutcome::Success
    }
}
