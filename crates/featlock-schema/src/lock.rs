use crate::options::FeatureOptions;
use crate::types::FeatureRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Key under which a resolver failure is persisted inside `expectedVersions`.
pub const RESOLVER_ERROR_KEY: &str = "__resolver_error";

/// Tool name to version string, always key-sorted.
pub type ToolVersions = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lock file lists feature '{0}' more than once")]
    DuplicateFeature(String),
}

/// Versions a resolver predicts for a feature.
///
/// On disk a failed resolution is the single-entry map
/// `{"__resolver_error": <message>}`; in memory it is a distinct variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ToolVersions", into = "ToolVersions")]
pub enum ExpectedVersions {
    Resolved(ToolVersions),
    Failed(String),
}

impl Default for ExpectedVersions {
    fn default() -> Self {
        ExpectedVersions::Resolved(ToolVersions::new())
    }
}

impl ExpectedVersions {
    pub fn is_failed(&self) -> bool {
        matches!(self, ExpectedVersions::Failed(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ExpectedVersions::Resolved(v) if v.is_empty())
    }

    pub fn get(&self, tool: &str) -> Option<&str> {
        match self {
            ExpectedVersions::Resolved(v) => v.get(tool).map(String::as_str),
            ExpectedVersions::Failed(_) => None,
        }
    }
}

impl From<ToolVersions> for ExpectedVersions {
    fn from(mut map: ToolVersions) -> Self {
        if map.len() == 1 {
            if let Some(message) = map.remove(RESOLVER_ERROR_KEY) {
                return ExpectedVersions::Failed(message);
            }
        }
        ExpectedVersions::Resolved(map)
    }
}

impl From<ExpectedVersions> for ToolVersions {
    fn from(expected: ExpectedVersions) -> Self {
        match expected {
            ExpectedVersions::Resolved(map) => map,
            ExpectedVersions::Failed(message) => {
                ToolVersions::from([(RESOLVER_ERROR_KEY.to_owned(), message)])
            }
        }
    }
}

/// Canonical snapshot of one configured feature.
///
/// Every tracked field is required when reading; a record missing one is not
/// a lock this tool wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    #[serde(rename = "ref")]
    pub reference: FeatureRef,
    #[serde(default)]
    pub name: Option<String>,
    pub digest: String,
    pub feature_version: String,
    pub options: FeatureOptions,
    pub product_versions: FeatureOptions,
    pub runtime_versions: ToolVersions,
    pub expected_versions: ExpectedVersions,
}

/// The persisted `features.lock` document.
///
/// Superseded wholesale on regeneration; never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockArtifact {
    pub generated_at: String,
    pub features: Vec<FeatureRecord>,
}

/// ISO-8601 UTC, second precision, trailing `Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl LockArtifact {
    /// Assemble an artifact; features are ordered by reference.
    pub fn new(mut features: Vec<FeatureRecord>, generated_at: DateTime<Utc>) -> Self {
        features.sort_by(|a, b| a.reference.cmp(&b.reference));
        Self {
            generated_at: format_timestamp(generated_at),
            features,
        }
    }

    /// Content equality ignoring `generatedAt`.
    pub fn same_content(&self, other: &LockArtifact) -> bool {
        self.features == other.features
    }

    pub fn feature_map(&self) -> BTreeMap<&FeatureRef, &FeatureRecord> {
        self.features.iter().map(|f| (&f.reference, f)).collect()
    }

    /// Pretty JSON with keys sorted at every level, newline-terminated.
    pub fn to_canonical_json(&self) -> Result<String, LockError> {
        // serde_json::Value objects are BTreeMap-backed, which sorts every level.
        let value = serde_json::to_value(self)?;
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        Ok(out)
    }

    pub fn from_json_str(input: &str) -> Result<Self, LockError> {
        let lock: LockArtifact = serde_json::from_str(input)?;
        let mut seen = BTreeSet::new();
        for feature in &lock.features {
            if !seen.insert(feature.reference.as_str()) {
                return Err(LockError::DuplicateFeature(feature.reference.to_string()));
            }
        }
        Ok(lock)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = self.to_canonical_json()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        // Fsync parent directory to ensure rename durability on power loss.
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        tracing::debug!("wrote lock file {}", path.display());
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn sample_record(reference: &str) -> FeatureRecord {
        let options = FeatureOptions::normalize([("version", "20"), ("pnpmVersion", "9.1.0")]);
        FeatureRecord {
            reference: FeatureRef::new(reference),
            name: Some("Node.js".to_owned()),
            digest: "sha256:aaaa".to_owned(),
            feature_version: "1.6.0".to_owned(),
            product_versions: options.product_versions(),
            options,
            runtime_versions: ToolVersions::from([("node".to_owned(), "v20.11.0".to_owned())]),
            expected_versions: ExpectedVersions::Resolved(ToolVersions::from([
                ("node".to_owned(), "20".to_owned()),
                ("pnpm".to_owned(), "9.1.0".to_owned()),
            ])),
        }
    }

    #[test]
    fn timestamp_has_second_precision_and_z_suffix() {
        assert_eq!(format_timestamp(at(1_700_000_000)), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn features_sorted_by_reference() {
        let lock = LockArtifact::new(
            vec![sample_record("ghcr.io/b:1"), sample_record("ghcr.io/a:1")],
            at(0),
        );
        assert_eq!(lock.features[0].reference, "ghcr.io/a:1");
        assert_eq!(lock.features[1].reference, "ghcr.io/b:1");
    }

    #[test]
    fn canonical_json_sorts_keys_at_every_level() {
        let lock = LockArtifact::new(vec![sample_record("ghcr.io/a:1")], at(0));
        let json = lock.to_canonical_json().unwrap();
        assert!(json.ends_with("}\n"));
        let features_pos = json.find("\"features\"").unwrap();
        let generated_pos = json.find("\"generatedAt\"").unwrap();
        assert!(features_pos < generated_pos);

        let order = [
            "\"digest\"",
            "\"expectedVersions\"",
            "\"featureVersion\"",
            "\"name\"",
            "\"options\"",
            "\"productVersions\"",
            "\"ref\"",
            "\"runtimeVersions\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "record keys must be sorted:\n{json}");
        assert!(json.find("\"pnpmVersion\"").unwrap() < json.find("\"version\"").unwrap());
    }

    #[test]
    fn canonical_json_is_byte_stable_apart_from_timestamp() {
        let a = LockArtifact::new(vec![sample_record("x"), sample_record("y")], at(10));
        let b = LockArtifact::new(vec![sample_record("y"), sample_record("x")], at(10));
        assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());
    }

    #[test]
    fn same_content_ignores_generated_at() {
        let a = LockArtifact::new(vec![sample_record("x")], at(10));
        let b = LockArtifact::new(vec![sample_record("x")], at(99_999));
        assert_ne!(a, b);
        assert!(a.same_content(&b));

        let mut changed = sample_record("x");
        changed.digest = "sha256:bbbb".to_owned();
        let c = LockArtifact::new(vec![changed], at(10));
        assert!(!a.same_content(&c));
    }

    #[test]
    fn resolver_failure_persists_as_sentinel_map() {
        let mut record = sample_record("x");
        record.expected_versions = ExpectedVersions::Failed("boom".to_owned());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value["expectedVersions"],
            serde_json::json!({ "__resolver_error": "boom" })
        );
        let back: FeatureRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.expected_versions, ExpectedVersions::Failed("boom".to_owned()));
    }

    #[test]
    fn sentinel_alongside_other_keys_is_plain_data() {
        let map: ToolVersions = serde_json::from_str(r#"{"__resolver_error":"x","go":"1"}"#).unwrap();
        let expected = ExpectedVersions::from(map);
        assert!(!expected.is_failed());
        assert_eq!(expected.get("go"), Some("1"));
    }

    #[test]
    fn null_name_deserializes() {
        let lock = LockArtifact::from_json_str(
            r#"{"generatedAt":"2024-01-01T00:00:00Z","features":[{"ref":"r","name":null,"digest":"d",
                "featureVersion":"","options":{},"productVersions":{},"runtimeVersions":{},"expectedVersions":{}}]}"#,
        )
        .unwrap();
        let f = &lock.features[0];
        assert_eq!(f.name, None);
        assert!(f.options.is_empty());
        assert!(f.runtime_versions.is_empty());
        assert!(f.expected_versions.is_empty());
    }

    #[test]
    fn record_missing_tracked_field_is_rejected() {
        for field in [
            "featureVersion",
            "options",
            "productVersions",
            "runtimeVersions",
            "expectedVersions",
        ] {
            let mut lock = serde_json::to_value(LockArtifact::new(vec![sample_record("r")], at(0))).unwrap();
            lock["features"][0].as_object_mut().unwrap().remove(field);
            let result = LockArtifact::from_json_str(&lock.to_string());
            assert!(
                matches!(result, Err(LockError::Json(ref e)) if e.to_string().contains(field)),
                "{field}: {result:?}"
            );
        }
    }

    #[test]
    fn unnamed_record_serializes_null_name() {
        let mut record = sample_record("x");
        record.name = None;
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["name"].is_null());
    }

    #[test]
    fn duplicate_references_rejected() {
        let record = serde_json::to_value(sample_record("r")).unwrap();
        let input = serde_json::json!({"generatedAt": "t", "features": [record, record]}).to_string();
        assert!(matches!(
            LockArtifact::from_json_str(&input),
            Err(LockError::DuplicateFeature(r)) if r == "r"
        ));
    }

    #[test]
    fn lock_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("features.lock");
        let lock = LockArtifact::new(vec![sample_record("a"), sample_record("b")], at(5));
        lock.write_to_file(&path).unwrap();

        let loaded = LockArtifact::read_from_file(&path).unwrap();
        assert_eq!(lock, loaded);
        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, lock.to_canonical_json().unwrap());
    }

    #[test]
    fn missing_lock_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LockArtifact::read_from_file(dir.path().join("absent.lock"));
        assert!(matches!(result, Err(LockError::Io(_))));
    }
}
