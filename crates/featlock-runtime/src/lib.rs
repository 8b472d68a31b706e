//! External collaborators of the snapshot builder.
//!
//! This crate wraps everything featlock learns by running other programs: the
//! OCI registry client (`crane`) used for digests, manifests, and filesystem
//! exports; feature metadata extraction with its annotation-then-archive
//! fallback; and the tool probes that report installed runtime versions.
//! In-memory doubles for all of them live in [`mock`].

pub mod fallback;
pub mod metadata;
pub mod mock;
pub mod probe;
pub mod registry;

pub use fallback::{first_non_empty, NonEmpty};
pub use metadata::{extract_metadata, FeatureMetadata, METADATA_ANNOTATION, METADATA_FILE};
pub use probe::{collect_runtime_versions, CommandProber, ProbeCommand, ProbeRunner};
pub use registry::{CraneClient, RegistryClient};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to start {command}: {reason}")]
    Spawn { command: String, reason: String },
    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unexpected output from {command}: {reason}")]
    InvalidOutput { command: String, reason: String },
}

impl RuntimeError {
    /// Exit code of the failed external command, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RuntimeError::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }

    /// Diagnostic text captured from the failed command.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            RuntimeError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
                Some(stderr.as_str())
            }
            _ => None,
        }
    }
}
