use crate::fallback::first_non_empty;
use crate::registry::RegistryClient;
use serde_json::{Map, Value};
use std::io::Read;
use tracing::{debug, warn};

/// Manifest annotation carrying the feature's metadata as a JSON string.
pub const METADATA_ANNOTATION: &str = "dev.containers.metadata";

/// Metadata file at the root of a feature's exported filesystem.
pub const METADATA_FILE: &str = "devcontainer-feature.json";

type Object = Map<String, Value>;

/// The fields of `devcontainer-feature.json` recorded in the lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
}

impl FeatureMetadata {
    fn from_object(object: &Object) -> Self {
        Self {
            name: object.get("name").and_then(scalar_text),
            version: object.get("version").and_then(scalar_text),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the metadata annotation out of a manifest document.
pub fn metadata_from_manifest(manifest: &str) -> Option<Object> {
    let doc: Value = serde_json::from_str(manifest).ok()?;
    let raw = doc.get("annotations")?.get(METADATA_ANNOTATION)?.as_str()?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => None,
        Err(e) => {
            debug!("metadata annotation is not valid JSON: {e}");
            None
        }
    }
}

/// Locate and parse the metadata file inside an exported tar stream.
pub fn metadata_from_archive(archive: &[u8]) -> Option<Object> {
    let mut ar = tar::Archive::new(archive);
    let entries = ar.entries().ok()?;
    for entry in entries {
        let mut entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("unreadable archive entry: {e}");
                return None;
            }
        };
        let matches = entry
            .path()
            .ok()
            .is_some_and(|p| normalize_entry_path(&p.to_string_lossy()) == METADATA_FILE);
        if !matches {
            continue;
        }
        let mut content = String::new();
        entry.read_to_string(&mut content).ok()?;
        return match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(object)) => Some(object),
            _ => None,
        };
    }
    None
}

fn normalize_entry_path(path: &str) -> &str {
    let mut p = path;
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            return p;
        }
    }
}

/// Best-effort metadata lookup: the manifest annotation first, then the
/// exported filesystem. Registry failures here are logged and yield empty
/// metadata.
pub fn extract_metadata(registry: &dyn RegistryClient, reference: &str) -> FeatureMetadata {
    let from_annotation = || match registry.manifest(reference) {
        Ok(manifest) => metadata_from_manifest(&manifest),
        Err(e) => {
            warn!("{reference}: manifest unavailable: {e}");
            None
        }
    };
    let from_export = || match registry.export_filesystem(reference) {
        Ok(archive) => metadata_from_archive(&archive),
        Err(e) => {
            warn!("{reference}: filesystem export unavailable: {e}");
            None
        }
    };

    match first_non_empty::<Object>(&[&from_annotation, &from_export]) {
        Some(object) => FeatureMetadata::from_object(&object),
        None => {
            warn!("{reference}: no feature metadata found");
            FeatureMetadata::default()
        }
    }
}
