//! Core snapshot and drift engine for featlock.
//!
//! This crate ties together the configuration schema, the version sources, and
//! the registry/probe runtime into the [`SnapshotBuilder`], which turns declared
//! devcontainer features into canonical [`FeatureRecord`](featlock_schema::FeatureRecord)s.
//! It also hosts the prefix-keyed resolver framework with the built-in
//! Go/Node/Python/Rust resolvers, and the lock diff engine that decides whether
//! a lock needs regeneration and reports drift.

pub mod builtin;
pub mod diff;
pub mod resolver;
pub mod snapshot;

pub use diff::{diff_features, diff_locks, needs_regeneration, DriftEntry, DriftReport, FieldChange};
pub use resolver::{ResolutionError, ResolveFn, ResolverDescriptor, ResolverRegistry};
pub use snapshot::SnapshotBuilder;

use featlock_runtime::RuntimeError;
use thiserror::Error;

/// A failure that stops a snapshot run.
///
/// Only the registry digest lookup is fatal; every other collaborator degrades
/// to an empty or failed value inside the record.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to resolve digest for {reference}: {source}")]
    Digest {
        reference: String,
        source: RuntimeError,
    },
}

impl CoreError {
    /// The external command failure behind this error, if any.
    pub fn command_failure(&self) -> Option<&RuntimeError> {
        match self {
            CoreError::Digest { source, .. } => Some(source),
        }
    }
}
