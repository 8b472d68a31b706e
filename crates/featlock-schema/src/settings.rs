use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CRANE: &str = "crane";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tool settings, read from an optional `featlock.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Registry client executable.
    #[serde(default = "default_crane")]
    pub crane: String,
    /// Timeout for each version-source HTTP fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Path to `devcontainer.json`, relative to the workspace.
    #[serde(default)]
    pub devcontainer: Option<PathBuf>,
    /// Path to the lock artifact, relative to the workspace.
    #[serde(default)]
    pub lock: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crane: default_crane(),
            fetch_timeout_secs: default_fetch_timeout(),
            devcontainer: None,
            lock: None,
        }
    }
}

fn default_crane() -> String {
    DEFAULT_CRANE.to_owned()
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Settings {
    pub fn parse_str(input: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `FEATLOCK_CRANE`, then `CRANE`, from the given lookup.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(crane) = lookup("FEATLOCK_CRANE").or_else(|| lookup("CRANE")) {
            if !crane.trim().is_empty() {
                self.crane = crane;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let settings = Settings::parse_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.crane, "crane");
        assert_eq!(settings.fetch_timeout_secs, 10);
    }

    #[test]
    fn parses_all_fields() {
        let settings = Settings::parse_str(
            r#"
crane = "/opt/bin/crane"
fetch_timeout_secs = 30
devcontainer = "config/devcontainer.json"
lock = "config/features.lock"
"#,
        )
        .unwrap();
        assert_eq!(settings.crane, "/opt/bin/crane");
        assert_eq!(settings.fetch_timeout_secs, 30);
        assert_eq!(settings.lock.as_deref(), Some(Path::new("config/features.lock")));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Settings::parse_str("retries = 3").is_err());
    }

    #[test]
    fn env_overrides_prefer_featlock_variable() {
        let settings = Settings::default().with_env_overrides(|k| match k {
            "FEATLOCK_CRANE" => Some("a".to_owned()),
            "CRANE" => Some("b".to_owned()),
            _ => None,
        });
        assert_eq!(settings.crane, "a");

        let settings = Settings::default().with_env_overrides(|k| {
            (k == "CRANE").then(|| "b".to_owned())
        });
        assert_eq!(settings.crane, "b");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("featlock.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
