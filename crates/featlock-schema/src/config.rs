use crate::options::{FeatureOptions, OptionValue};
use crate::types::FeatureRef;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("devcontainer config not found: {0}")]
    NotFound(String),
    #[error("failed to read devcontainer config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse devcontainer config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("devcontainer 'features' must be an object")]
    FeaturesNotObject,
    #[error("options for feature '{reference}' must be an object or null")]
    OptionsNotObject { reference: String },
    #[error("option '{option}' of feature '{reference}' must be a string, boolean, or number")]
    InvalidOptionValue { reference: String, option: String },
}

/// Only the part of `devcontainer.json` this tool reads.
#[derive(Debug, Deserialize)]
struct DevcontainerDocument {
    #[serde(default)]
    features: Option<serde_json::Value>,
}

/// Features declared in the configuration, keyed and ordered by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredFeatures {
    entries: BTreeMap<FeatureRef, FeatureOptions>,
}

impl DeclaredFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<FeatureRef>, options: FeatureOptions) {
        self.entries.insert(reference.into(), options);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureRef, &FeatureOptions)> {
        self.entries.iter()
    }
}

impl<R: Into<FeatureRef>> FromIterator<(R, FeatureOptions)> for DeclaredFeatures {
    fn from_iter<I: IntoIterator<Item = (R, FeatureOptions)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(r, o)| (r.into(), o)).collect(),
        }
    }
}

pub fn parse_devcontainer_str(input: &str) -> Result<DeclaredFeatures, ConfigError> {
    let doc: DevcontainerDocument = serde_json::from_str(input)?;
    let features = match doc.features {
        None | Some(serde_json::Value::Null) => return Ok(DeclaredFeatures::new()),
        Some(serde_json::Value::Object(map)) => map,
        Some(_) => return Err(ConfigError::FeaturesNotObject),
    };

    let mut declared = DeclaredFeatures::new();
    for (reference, raw) in features {
        let options = match raw {
            serde_json::Value::Null => FeatureOptions::new(),
            serde_json::Value::Object(map) => {
                let mut options = FeatureOptions::new();
                for (option, value) in map {
                    let value = match value {
                        serde_json::Value::Bool(b) => OptionValue::Bool(b),
                        serde_json::Value::Number(n) => OptionValue::Number(n),
                        serde_json::Value::String(s) => OptionValue::String(s),
                        _ => {
                            return Err(ConfigError::InvalidOptionValue { reference, option });
                        }
                    };
                    options.insert(option, value);
                }
                options
            }
            _ => return Err(ConfigError::OptionsNotObject { reference }),
        };
        declared.insert(reference, options);
    }
    Ok(declared)
}

pub fn load_devcontainer_features(path: impl AsRef<Path>) -> Result<DeclaredFeatures, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    let declared = parse_devcontainer_str(&content)?;
    tracing::debug!(
        "loaded {} feature(s) from {}",
        declared.len(),
        path.display()
    );
    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_features_sorted_by_reference() {
        let input = r#"{
  "name": "dev",
  "image": "mcr.microsoft.com/devcontainers/base:ubuntu",
  "features": {
    "ghcr.io/devcontainers/features/python:1": { "version": "3.12" },
    "ghcr.io/devcontainers/features/go:1": {},
    "ghcr.io/devcontainers/features/node:1": { "version": "lts", "pnpmVersion": "latest" }
  }
}"#;
        let declared = parse_devcontainer_str(input).unwrap();
        let refs: Vec<&str> = declared.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(
            refs,
            vec![
                "ghcr.io/devcontainers/features/go:1",
                "ghcr.io/devcontainers/features/node:1",
                "ghcr.io/devcontainers/features/python:1",
            ]
        );
        let (_, node) = declared.iter().nth(1).unwrap();
        assert_eq!(node.get("version"), Some(&OptionValue::from("lts")));
    }

    #[test]
    fn null_options_become_empty() {
        let declared = parse_devcontainer_str(r#"{"features": {"ghcr.io/x/y:1": null}}"#).unwrap();
        let (_, options) = declared.iter().next().unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn missing_features_is_empty() {
        assert!(parse_devcontainer_str(r#"{"image": "x"}"#).unwrap().is_empty());
        assert!(parse_devcontainer_str(r#"{"features": null}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_devcontainer_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_non_object_features() {
        assert!(matches!(
            parse_devcontainer_str(r#"{"features": ["a"]}"#),
            Err(ConfigError::FeaturesNotObject)
        ));
    }

    #[test]
    fn rejects_non_object_options() {
        assert!(matches!(
            parse_devcontainer_str(r#"{"features": {"r": "1.0"}}"#),
            Err(ConfigError::OptionsNotObject { .. })
        ));
    }

    #[test]
    fn rejects_nested_option_values() {
        let err = parse_devcontainer_str(r#"{"features": {"r": {"extra": {"a": 1}}}}"#).unwrap_err();
        assert!(err.to_string().contains("'extra'"));
    }

    #[test]
    fn missing_file_reported_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_devcontainer_features(dir.path().join("devcontainer.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devcontainer.json");
        fs::write(&path, r#"{"features": {"ghcr.io/a/b:1": {"flag": true}}}"#).unwrap();
        let declared = load_devcontainer_features(&path).unwrap();
        assert_eq!(declared.len(), 1);
    }
}
