//! Connection settings for the SQLite store.

use std::time::Duration;

use camino::Utf8PathBuf;

/// Default database file name, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "geolocation.db";

/// How to reach the SQLite database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file. Missing parent directories are created on connect.
    pub path: Utf8PathBuf,
    /// Extra attempts made after the first connection failure.
    pub connect_retries: u32,
    /// Pause between connection attempts.
    pub retry_interval: Duration,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Settings for `path` with default retry behaviour.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retries(mut self, connect_retries: u32, retry_interval: Duration) -> Self {
        self.connect_retries = connect_retries;
        self.retry_interval = retry_interval;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from(DEFAULT_DATABASE),
            connect_retries: 3,
            retry_interval: Duration::from_secs(1),
            busy_timeout: Duration::from_secs(5),
        }
    }
}
