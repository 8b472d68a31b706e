//! Version source clients for featlock.
//!
//! This crate provides the external version oracles used by resolvers: a
//! URL-to-text fetcher with an in-process response cache, a JSON helper on top
//! of it, a `git ls-remote` tag lister, and numeric latest-tag selection. All
//! of them are reached through [`VersionSources`], which owns the cache for
//! the lifetime of one run.

pub mod config;
pub mod git;
pub mod http;
pub mod mock;
pub mod tags;

pub use config::SourceConfig;
pub use git::GitTagLister;
pub use http::{CachedFetcher, HttpFetcher};
pub use tags::latest_tag_version;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("response from {url} is not valid UTF-8")]
    Decode { url: String },
    #[error("failed to query tags from {repo}: {diagnostic}")]
    TagQuery { repo: String, diagnostic: String },
    #[error("no version tags matching {prefix} found for {repo}")]
    NoMatchingVersion { prefix: String, repo: String },
    #[error("unexpected response from {what}: {reason}")]
    Parse { what: String, reason: String },
}

/// Fetches the body of a URL as text.
pub trait TextSource: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, SourceError>;
}

/// Lists the tag refs of a remote repository.
pub trait TagSource: Send + Sync {
    /// Returns refs such as `refs/tags/v1.2.3`, with `^{}` suffixes stripped.
    fn list_remote_tags(&self, repo: &str) -> Result<Vec<String>, SourceError>;
}

impl<T: TextSource + ?Sized> TextSource for std::sync::Arc<T> {
    fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        (**self).fetch_text(url)
    }
}

impl<T: TagSource + ?Sized> TagSource for std::sync::Arc<T> {
    fn list_remote_tags(&self, repo: &str) -> Result<Vec<String>, SourceError> {
        (**self).list_remote_tags(repo)
    }
}

/// The version oracles available to resolvers during one run.
pub struct VersionSources {
    text: CachedFetcher,
    tags: Box<dyn TagSource>,
}

impl VersionSources {
    pub fn new(text: Box<dyn TextSource>, tags: Box<dyn TagSource>) -> Self {
        Self {
            text: CachedFetcher::new(text),
            tags,
        }
    }

    /// Live sources: HTTP over `ureq` and `git ls-remote`.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            Box::new(HttpFetcher::new(config)),
            Box::new(GitTagLister::new(&config.git)),
        )
    }

    /// Fetch a URL; repeated calls for the same URL are served from cache.
    pub fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        self.text.fetch_text(url)
    }

    pub fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let text = self.fetch_text(url)?;
        serde_json::from_str(&text).map_err(|e| SourceError::Parse {
            what: url.to_owned(),
            reason: e.to_string(),
        })
    }

    pub fn list_remote_tags(&self, repo: &str) -> Result<Vec<String>, SourceError> {
        tracing::debug!("listing tags of {repo}");
        self.tags.list_remote_tags(repo)
    }

    /// Highest `refs/<prefix>N{sep}N...` tag with exactly `parts` numeric
    /// components, compared numerically.
    pub fn resolve_latest_tag_version(
        &self,
        repo: &str,
        prefix: &str,
        parts: usize,
        separator: &str,
    ) -> Result<String, SourceError> {
        let refs = self.list_remote_tags(repo)?;
        latest_tag_version(&refs, prefix, parts, separator).ok_or_else(|| {
            SourceError::NoMatchingVersion {
                prefix: format!("refs/{prefix}"),
                repo: repo.to_owned(),
            }
        })
    }
}
