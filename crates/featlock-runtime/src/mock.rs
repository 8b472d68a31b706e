//! In-memory doubles for the registry client and tool probes.

use crate::probe::ProbeRunner;
use crate::registry::RegistryClient;
use crate::RuntimeError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One image as the mock registry serves it.
#[derive(Debug, Clone, Default)]
pub struct MockImage {
    digest: String,
    manifest: Option<String>,
    export: Option<Vec<u8>>,
}

impl MockImage {
    pub fn new(digest: &str) -> Self {
        Self {
            digest: digest.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: &str) -> Self {
        self.manifest = Some(manifest.to_owned());
        self
    }

    #[must_use]
    pub fn with_export(mut self, archive: Vec<u8>) -> Self {
        self.export = Some(archive);
        self
    }
}

/// Registry serving canned images. Unknown references fail the way `crane`
/// does for a missing manifest.
#[derive(Default)]
pub struct MockRegistry {
    images: HashMap<String, MockImage>,
    export_calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, reference: &str, image: MockImage) -> Self {
        self.images.insert(reference.to_owned(), image);
        self
    }

    pub fn export_calls(&self) -> usize {
        self.export_calls.load(Ordering::SeqCst)
    }

    fn image(&self, subcommand: &str, reference: &str) -> Result<&MockImage, RuntimeError> {
        self.images
            .get(reference)
            .ok_or_else(|| not_found(subcommand, reference))
    }
}

fn not_found(subcommand: &str, reference: &str) -> RuntimeError {
    RuntimeError::CommandFailed {
        command: format!("crane {subcommand} {reference}"),
        code: Some(1),
        stderr: format!("MANIFEST_UNKNOWN: manifest unknown: {reference}\n"),
    }
}

impl RegistryClient for MockRegistry {
    fn digest(&self, reference: &str) -> Result<String, RuntimeError> {
        Ok(self.image("digest", reference)?.digest.clone())
    }

    fn manifest(&self, reference: &str) -> Result<String, RuntimeError> {
        self.image("manifest", reference)?
            .manifest
            .clone()
            .ok_or_else(|| not_found("manifest", reference))
    }

    fn export_filesystem(&self, reference: &str) -> Result<Vec<u8>, RuntimeError> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        self.image("export", reference)?
            .export
            .clone()
            .ok_or_else(|| not_found("export", reference))
    }
}

/// Prober answering from a fixed table keyed by the full command line.
#[derive(Debug, Default, Clone)]
pub struct MockProber {
    outputs: HashMap<String, String>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_output(mut self, argv: &[&str], output: &str) -> Self {
        self.outputs.insert(argv.join(" "), output.to_owned());
        self
    }
}

impl ProbeRunner for MockProber {
    fn probe(&self, argv: &[&str]) -> Option<String> {
        self.outputs.get(&argv.join(" ")).cloned()
    }
}

/// Build an uncompressed tar stream holding the given files.
pub fn feature_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut ar = tar::Builder::new(Vec::new());
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        if let Err(e) = ar.append_data(&mut header, path, *data) {
            tracing::warn!("skipping {path} in mock archive: {e}");
        }
    }
    ar.into_inner().unwrap_or_default()
}
