//! Feature options, lock artifact format, and configuration loading for featlock.
//!
//! This crate defines the schema layer: the devcontainer configuration source
//! (`DeclaredFeatures`), normalized feature options (`FeatureOptions`), the
//! canonical per-feature snapshot (`FeatureRecord`), the persisted lock document
//! (`LockArtifact`), and tool settings read from `featlock.toml`.

pub mod config;
pub mod lock;
pub mod options;
pub mod settings;
pub mod types;

pub use config::{load_devcontainer_features, parse_devcontainer_str, ConfigError, DeclaredFeatures};
pub use lock::{
    format_timestamp, ExpectedVersions, FeatureRecord, LockArtifact, LockError, ToolVersions,
    RESOLVER_ERROR_KEY,
};
pub use options::{FeatureOptions, OptionValue};
pub use settings::{Settings, SettingsError};
pub use types::FeatureRef;
