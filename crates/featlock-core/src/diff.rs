use featlock_schema::{FeatureRecord, FeatureRef, LockArtifact};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One tracked field that differs between the lock and the fresh snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: Value,
    pub after: Value,
}

/// Drift for a single feature reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DriftEntry {
    New {
        reference: FeatureRef,
        digest: String,
        feature_version: String,
    },
    Removed {
        reference: FeatureRef,
    },
    Changed {
        reference: FeatureRef,
        changes: Vec<FieldChange>,
    },
}

impl DriftEntry {
    pub fn reference(&self) -> &FeatureRef {
        match self {
            DriftEntry::New { reference, .. }
            | DriftEntry::Removed { reference }
            | DriftEntry::Changed { reference, .. } => reference,
        }
    }
}

impl fmt::Display for DriftEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftEntry::New {
                reference,
                digest,
                feature_version,
            } => {
                let version = if feature_version.is_empty() {
                    "unknown"
                } else {
                    feature_version
                };
                write!(f, "NEW feature {reference} -> {digest} (version {version})")
            }
            DriftEntry::Removed { reference } => write!(f, "REMOVED feature {reference}"),
            DriftEntry::Changed { reference, changes } => {
                write!(f, "CHANGED {reference}: ")?;
                for (i, change) in changes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}: {} -> {}", change.field, change.before, change.after)?;
                }
                Ok(())
            }
        }
    }
}

/// Result of comparing a lock against a fresh snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriftReport {
    pub has_drift: bool,
    pub entries: Vec<DriftEntry>,
}

impl DriftReport {
    fn from_entries(entries: Vec<DriftEntry>) -> Self {
        Self {
            has_drift: !entries.is_empty(),
            entries,
        }
    }
}

fn json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Tracked fields of two records with the same reference that differ.
fn changed_fields(before: &FeatureRecord, after: &FeatureRecord) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let mut track = |field: &'static str, differs: bool, b: Value, a: Value| {
        if differs {
            changes.push(FieldChange {
                field,
                before: b,
                after: a,
            });
        }
    };

    track(
        "digest",
        before.digest != after.digest,
        json(&before.digest),
        json(&after.digest),
    );
    track(
        "featureVersion",
        before.feature_version != after.feature_version,
        json(&before.feature_version),
        json(&after.feature_version),
    );
    track(
        "options",
        before.options != after.options,
        json(&before.options),
        json(&after.options),
    );
    track(
        "productVersions",
        before.product_versions != after.product_versions,
        json(&before.product_versions),
        json(&after.product_versions),
    );
    track(
        "runtimeVersions",
        before.runtime_versions != after.runtime_versions,
        json(&before.runtime_versions),
        json(&after.runtime_versions),
    );
    track(
        "expectedVersions",
        before.expected_versions != after.expected_versions,
        json(&before.expected_versions),
        json(&after.expected_versions),
    );
    changes
}

/// Classify every reference present in either map, in reference order.
pub fn diff_features(
    existing: &BTreeMap<&FeatureRef, &FeatureRecord>,
    fresh: &BTreeMap<&FeatureRef, &FeatureRecord>,
) -> DriftReport {
    let references: BTreeSet<&FeatureRef> = existing.keys().chain(fresh.keys()).copied().collect();

    let mut entries = Vec::new();
    for reference in references {
        match (existing.get(reference), fresh.get(reference)) {
            (None, Some(after)) => entries.push(DriftEntry::New {
                reference: reference.clone(),
                digest: after.digest.clone(),
                feature_version: after.feature_version.clone(),
            }),
            (Some(_), None) => entries.push(DriftEntry::Removed {
                reference: reference.clone(),
            }),
            (Some(before), Some(after)) => {
                let changes = changed_fields(before, after);
                if !changes.is_empty() {
                    entries.push(DriftEntry::Changed {
                        reference: reference.clone(),
                        changes,
                    });
                }
            }
            (None, None) => {}
        }
    }
    DriftReport::from_entries(entries)
}

pub fn diff_locks(existing: &LockArtifact, fresh: &LockArtifact) -> DriftReport {
    diff_features(&existing.feature_map(), &fresh.feature_map())
}

/// Whether `fresh` should replace `existing` on disk. The timestamp alone
/// never forces a rewrite.
pub fn needs_regeneration(existing: Option<&LockArtifact>, fresh: &LockArtifact) -> bool {
    existing.map_or(true, |current| !current.same_content(fresh))
}
