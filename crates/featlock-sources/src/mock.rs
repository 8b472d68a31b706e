//! In-memory version sources with canned responses and call recording.

use crate::{SourceError, TagSource, TextSource};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Canned URL responses. Unknown URLs fail with [`SourceError::Fetch`].
#[derive(Default)]
pub struct StaticTextSource {
    responses: HashMap<String, Result<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_response(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_owned(), Ok(body.to_owned()));
        self
    }

    #[must_use]
    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.responses.insert(url.to_owned(), Err(reason.to_owned()));
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TextSource for StaticTextSource {
    fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(reason)) => Err(SourceError::Fetch {
                url: url.to_owned(),
                reason: reason.clone(),
            }),
            None => Err(SourceError::Fetch {
                url: url.to_owned(),
                reason: "no canned response".to_owned(),
            }),
        }
    }
}

/// Canned tag listings per repository.
#[derive(Default)]
pub struct StaticTagSource {
    tags: HashMap<String, Result<Vec<String>, String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticTagSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tags(mut self, repo: &str, refs: &[&str]) -> Self {
        self.tags.insert(
            repo.to_owned(),
            Ok(refs.iter().map(|r| (*r).to_owned()).collect()),
        );
        self
    }

    #[must_use]
    pub fn with_failure(mut self, repo: &str, diagnostic: &str) -> Self {
        self.tags
            .insert(repo.to_owned(), Err(diagnostic.to_owned()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TagSource for StaticTagSource {
    fn list_remote_tags(&self, repo: &str) -> Result<Vec<String>, SourceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(repo.to_owned());
        match self.tags.get(repo) {
            Some(Ok(refs)) => Ok(refs.clone()),
            Some(Err(diagnostic)) => Err(SourceError::TagQuery {
                repo: repo.to_owned(),
                diagnostic: diagnostic.clone(),
            }),
            None => Err(SourceError::TagQuery {
                repo: repo.to_owned(),
                diagnostic: "no canned tags".to_owned(),
            }),
        }
    }
}
