use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Registry location of a devcontainer feature, e.g.
/// `ghcr.io/devcontainers/features/node:1`. The unique key of every record.
///
/// Serialized as a plain string and ordered like one, so maps keyed by it
/// iterate in lock order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRef(String);

impl FeatureRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for FeatureRef {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FeatureRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FeatureRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for FeatureRef {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FeatureRef {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<String> for FeatureRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl From<&str> for FeatureRef {
    fn from(reference: &str) -> Self {
        Self(reference.to_owned())
    }
}
