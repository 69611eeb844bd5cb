//! Shared blocking HTTP client for feed, detail page and artifact requests.
//!
//! Wraps a [`ureq::Agent`] so every request carries the same User-Agent and,
//! when configured, the same timeouts. Requests block the calling thread.

use crate::config::FeedConfig;
use crate::error::FeedError;
use std::io::Read;
use std::time::Duration;

/// User-Agent sent when the configuration does not name one.
pub const DEFAULT_USER_AGENT: &str = concat!("release-feed/", env!("CARGO_PKG_VERSION"));

/// Connect timeout used when the configuration sets none. Reads stay unbounded.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP client used by every network stage of the updater.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build a client from the feed configuration.
    pub fn new(config: &FeedConfig) -> Self {
        let read_timeout = config.timeout_seconds.map(Duration::from_secs);
        let connect_timeout = read_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);

        let mut builder = ureq::AgentBuilder::new().timeout_connect(connect_timeout);
        if let Some(timeout) = read_timeout {
            builder = builder.timeout_read(timeout);
        }

        Self {
            agent: builder.build(),
            connect_timeout,
            read_timeout,
            user_agent: config
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        }
    }

    /// The User-Agent this client sends.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Timeout for establishing a connection.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Timeout for each read of a response body, `None` when unbounded.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Send a GET request and return the response body as a stream.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the request cannot be sent or the
    /// server answers with a 4xx/5xx status.
    pub fn open(&self, url: &str) -> Result<Box<dyn Read + Send + Sync + 'static>, FeedError> {
        tracing::trace!(url, "GET");
        let response = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => {
                    FeedError::Http(format!("{url} answered with status {code}"))
                }
                other => FeedError::Http(format!("request to {url} failed: {other}")),
            })?;

        Ok(response.into_reader())
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(&FeedConfig::default())
    }
}
