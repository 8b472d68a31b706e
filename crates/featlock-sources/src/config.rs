use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the live version sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Bound on each HTTP fetch. No retries are attempted.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// `git` executable used for tag listings.
    pub git: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("featlock/", env!("CARGO_PKG_VERSION")).to_owned(),
            git: "git".to_owned(),
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
