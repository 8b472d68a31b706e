use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single declared option value. Devcontainer features accept strings,
/// booleans, and numbers; anything else is rejected at load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl OptionValue {
    /// Text form used when an option feeds a version lookup.
    pub fn as_text(&self) -> String {
        match self {
            OptionValue::Bool(b) => b.to_string(),
            OptionValue::Number(n) => n.to_string(),
            OptionValue::String(s) => s.clone(),
        }
    }

    /// `false`, zero, and the empty string are "not set".
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            OptionValue::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::String(s.to_owned())
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

/// Normalized option mapping for one feature.
///
/// Keys are held sorted, so two mappings with the same pairs compare and
/// serialize identically regardless of declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FeatureOptions(BTreeMap<String, OptionValue>);

impl FeatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized mapping from pairs in any order.
    pub fn normalize<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// Options whose key contains "version", case-insensitively.
    pub fn product_versions(&self) -> FeatureOptions {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| k.to_lowercase().contains("version"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, OptionValue)> for FeatureOptions {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeatureOptions {
    type Item = (&'a String, &'a OptionValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
