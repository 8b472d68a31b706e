use crate::resolver::ResolverRegistry;
use crate::CoreError;
use chrono::{DateTime, Utc};
use featlock_runtime::{collect_runtime_versions, extract_metadata, ProbeRunner, RegistryClient};
use featlock_schema::{
    DeclaredFeatures, ExpectedVersions, FeatureOptions, FeatureRecord, FeatureRef, LockArtifact,
    ToolVersions,
};
use featlock_sources::VersionSources;
use tracing::{debug, info, warn};

/// Builds canonical feature records from declared features.
///
/// Owns the version sources, and with them the URL cache, for as long as the
/// builder lives. Create one per run.
pub struct SnapshotBuilder {
    registry: Box<dyn RegistryClient>,
    prober: Box<dyn ProbeRunner>,
    sources: VersionSources,
    resolvers: ResolverRegistry,
}

impl SnapshotBuilder {
    /// Builder using the built-in resolver table.
    pub fn new(
        registry: Box<dyn RegistryClient>,
        prober: Box<dyn ProbeRunner>,
        sources: VersionSources,
    ) -> Self {
        Self {
            registry,
            prober,
            sources,
            resolvers: ResolverRegistry::builtin(),
        }
    }

    #[must_use]
    pub fn with_resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn sources(&self) -> &VersionSources {
        &self.sources
    }

    /// Snapshot one feature. Only a digest failure is an error; metadata,
    /// probes, and resolvers degrade to empty or failed values.
    pub fn snapshot_feature(
        &self,
        reference: &FeatureRef,
        options: &FeatureOptions,
    ) -> Result<FeatureRecord, CoreError> {
        info!("snapshotting {reference}");

        let digest = self
            .registry
            .digest(reference)
            .map_err(|source| CoreError::Digest {
                reference: reference.to_string(),
                source,
            })?;
        debug!("{reference} digest {digest}");

        let metadata = extract_metadata(self.registry.as_ref(), reference);

        let descriptor = self.resolvers.lookup(reference);
        let (runtime_versions, expected_versions) = match descriptor {
            Some(descriptor) => {
                debug!("{reference} uses the {} resolver", descriptor.name);
                let runtime = collect_runtime_versions(self.prober.as_ref(), descriptor.probes);
                let expected = match descriptor.resolve {
                    Some(resolve) => match resolve(options, &self.sources) {
                        Ok(versions) => ExpectedVersions::Resolved(versions),
                        Err(e) => {
                            warn!("{reference}: {e}");
                            ExpectedVersions::Failed(e.to_string())
                        }
                    },
                    None => ExpectedVersions::default(),
                };
                (runtime, expected)
            }
            None => {
                debug!("{reference} has no registered resolver");
                (ToolVersions::new(), ExpectedVersions::default())
            }
        };

        Ok(FeatureRecord {
            reference: reference.clone(),
            name: metadata.name,
            digest,
            feature_version: metadata.version.unwrap_or_default(),
            options: options.clone(),
            product_versions: options.product_versions(),
            runtime_versions,
            expected_versions,
        })
    }

    /// Snapshot every declared feature in reference order.
    pub fn snapshot(&self, declared: &DeclaredFeatures) -> Result<Vec<FeatureRecord>, CoreError> {
        self.snapshot_with_progress(declared, |_, _, _| {})
    }

    /// As [`snapshot`](Self::snapshot), calling `progress(index, total, reference)`
    /// before each feature.
    pub fn snapshot_with_progress(
        &self,
        declared: &DeclaredFeatures,
        mut progress: impl FnMut(usize, usize, &FeatureRef),
    ) -> Result<Vec<FeatureRecord>, CoreError> {
        let total = declared.len();
        let mut records = Vec::with_capacity(total);
        for (index, (reference, options)) in declared.iter().enumerate() {
            progress(index, total, reference);
            records.push(self.snapshot_feature(reference, options)?);
        }
        Ok(records)
    }

    /// Snapshot and wrap the records in a lock artifact stamped `generated_at`.
    pub fn build_lock(
        &self,
        declared: &DeclaredFeatures,
        generated_at: DateTime<Utc>,
    ) -> Result<LockArtifact, CoreError> {
        Ok(LockArtifact::new(self.snapshot(declared)?, generated_at))
    }
}
