use featlock_runtime::ProbeCommand;
use featlock_schema::{FeatureOptions, ToolVersions};
use featlock_sources::{SourceError, VersionSources};
use std::fmt;
use thiserror::Error;

/// Failure of a single resolver invocation. The `Display` text is what ends
/// up in the lock when resolution fails.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to resolve {what}: {source}")]
    Source {
        what: &'static str,
        source: SourceError,
    },
    #[error("{0}")]
    Unresolved(String),
}

impl ResolutionError {
    pub fn from_source(what: &'static str) -> impl FnOnce(SourceError) -> Self {
        move |source| ResolutionError::Source { what, source }
    }
}

/// Maps declared options to the tool versions they should produce.
pub type ResolveFn = fn(&FeatureOptions, &VersionSources) -> Result<ToolVersions, ResolutionError>;

/// What featlock knows how to check for one family of features.
#[derive(Clone, Copy)]
pub struct ResolverDescriptor {
    pub name: &'static str,
    pub probes: &'static [ProbeCommand],
    pub resolve: Option<ResolveFn>,
}

impl fmt::Debug for ResolverDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverDescriptor")
            .field("name", &self.name)
            .field("probes", &self.probes)
            .field("resolve", &self.resolve.is_some())
            .finish()
    }
}

impl ResolverDescriptor {
    pub const fn new(name: &'static str, probes: &'static [ProbeCommand]) -> Self {
        Self {
            name,
            probes,
            resolve: None,
        }
    }

    #[must_use]
    pub const fn with_resolver(mut self, resolve: ResolveFn) -> Self {
        self.resolve = Some(resolve);
        self
    }
}

/// Feature reference prefixes mapped to resolver descriptors.
///
/// Lookup picks the longest registered prefix of the reference; among equal
/// lengths the earliest registration wins.
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    entries: Vec<(String, ResolverDescriptor)>,
}

impl ResolverRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry preloaded with the Go, Node, Python, and Rust resolvers.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (prefix, descriptor) in crate::builtin::descriptors() {
            registry.register(prefix, descriptor);
        }
        registry
    }

    pub fn register(&mut self, prefix: impl Into<String>, descriptor: ResolverDescriptor) {
        self.entries.push((prefix.into(), descriptor));
    }

    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>, descriptor: ResolverDescriptor) -> Self {
        self.register(prefix, descriptor);
        self
    }

    pub fn lookup(&self, reference: &str) -> Option<&ResolverDescriptor> {
        let mut best: Option<&(String, ResolverDescriptor)> = None;
        for entry in &self.entries {
            if !reference.starts_with(entry.0.as_str()) {
                continue;
            }
            match best {
                Some(b) if b.0.len() >= entry.0.len() => {}
                _ => best = Some(entry),
            }
        }
        best.map(|(_, descriptor)| descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
