use crate::RuntimeError;
use std::process::{Command, Stdio};
use tracing::debug;

/// Read-only access to a content-addressable OCI registry.
pub trait RegistryClient: Send + Sync {
    /// Content digest of the image, e.g. `sha256:...`.
    fn digest(&self, reference: &str) -> Result<String, RuntimeError>;

    /// Raw manifest JSON.
    fn manifest(&self, reference: &str) -> Result<String, RuntimeError>;

    /// The image's flattened filesystem as a tar stream.
    fn export_filesystem(&self, reference: &str) -> Result<Vec<u8>, RuntimeError>;
}

impl<T: RegistryClient + ?Sized> RegistryClient for std::sync::Arc<T> {
    fn digest(&self, reference: &str) -> Result<String, RuntimeError> {
        (**self).digest(reference)
    }

    fn manifest(&self, reference: &str) -> Result<String, RuntimeError> {
        (**self).manifest(reference)
    }

    fn export_filesystem(&self, reference: &str) -> Result<Vec<u8>, RuntimeError> {
        (**self).export_filesystem(reference)
    }
}

/// Registry client backed by the `crane` executable.
pub struct CraneClient {
    binary: String,
}

impl CraneClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, RuntimeError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!("running {command}");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RuntimeError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }

    fn run_text(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let stdout = self.run(args)?;
        String::from_utf8(stdout).map_err(|e| RuntimeError::InvalidOutput {
            command: format!("{} {}", self.binary, args.join(" ")),
            reason: e.to_string(),
        })
    }
}

impl Default for CraneClient {
    fn default() -> Self {
        Self::new("crane")
    }
}

impl RegistryClient for CraneClient {
    fn digest(&self, reference: &str) -> Result<String, RuntimeError> {
        let digest = self.run_text(&["digest", reference])?.trim().to_owned();
        if digest.is_empty() {
            return Err(RuntimeError::InvalidOutput {
                command: format!("{} digest {reference}", self.binary),
                reason: "empty digest".to_owned(),
            });
        }
        Ok(digest)
    }

    fn manifest(&self, reference: &str) -> Result<String, RuntimeError> {
        self.run_text(&["manifest", reference])
    }

    fn export_filesystem(&self, reference: &str) -> Result<Vec<u8>, RuntimeError> {
        self.run(&["export", reference, "-"])
    }
}
