pub mod check;
pub mod generate;

use featlock_core::{CoreError, SnapshotBuilder};
use featlock_runtime::{CommandProber, CraneClient};
use featlock_schema::{load_devcontainer_features, DeclaredFeatures, FeatureRecord, Settings};
use featlock_sources::{SourceConfig, VersionSources};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DRIFT: u8 = 1;
pub const EXIT_MISSING_LOCK: u8 = 2;

/// A fatal command error: a one-line message, any captured diagnostic text,
/// and the process exit code.
#[derive(Debug)]
pub struct Failure {
    pub message: String,
    pub detail: Option<String>,
    pub code: u8,
}

impl Failure {
    pub fn new(message: impl Into<String>, code: u8) -> Self {
        Self {
            message: message.into(),
            detail: None,
            code,
        }
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message, EXIT_FAILURE)
    }
}

impl From<CoreError> for Failure {
    fn from(err: CoreError) -> Self {
        let Some(failure) = err.command_failure() else {
            return Self::new(err.to_string(), EXIT_FAILURE);
        };
        Self {
            message: err.to_string(),
            detail: failure.diagnostic().map(|d| d.trim_end().to_owned()),
            code: exit_code_of(failure.exit_code()),
        }
    }
}

/// The external command's own exit code, or 1 when it has none that fits.
fn exit_code_of(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok())
        .filter(|c| *c != 0)
        .unwrap_or(EXIT_FAILURE)
}

/// Resolved paths and settings for one invocation.
pub struct Context {
    pub devcontainer: PathBuf,
    pub lock: PathBuf,
    pub settings: Settings,
    pub json: bool,
}

impl Context {
    pub fn load_declared(&self) -> Result<DeclaredFeatures, Failure> {
        load_devcontainer_features(&self.devcontainer).map_err(|e| {
            Failure::new(
                format!("{}: {e}", self.devcontainer.display()),
                EXIT_FAILURE,
            )
        })
    }

    /// A snapshot builder wired to the live registry, probes, and sources.
    pub fn snapshot_builder(&self) -> SnapshotBuilder {
        let sources = SourceConfig::default().with_timeout_secs(self.settings.fetch_timeout_secs);
        SnapshotBuilder::new(
            Box::new(CraneClient::new(self.settings.crane.clone())),
            Box::new(CommandProber),
            VersionSources::from_config(&sources),
        )
    }

    /// Snapshot every declared feature, with a spinner unless in JSON mode.
    pub fn snapshot(
        &self,
        declared: &DeclaredFeatures,
    ) -> Result<Vec<FeatureRecord>, Failure> {
        let builder = self.snapshot_builder();
        let pb = (!self.json).then(|| spinner("snapshotting features..."));

        let result = builder.snapshot_with_progress(declared, |index, total, reference| {
            if let Some(ref pb) = pb {
                pb.set_message(format!("[{}/{total}] {reference}", index + 1));
            }
        });
        match result {
            Ok(records) => {
                if let Some(ref pb) = pb {
                    spin_ok(pb, &format!("snapshotted {} feature(s)", records.len()));
                }
                Ok(records)
            }
            Err(e) => {
                if let Some(ref pb) = pb {
                    spin_fail(pb, "snapshot failed");
                }
                Err(e.into())
            }
        }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Color a drift line by its kind.
pub fn colorize_drift(line: &str) -> String {
    use console::Style;
    let style = if line.starts_with("NEW") {
        Style::new().green()
    } else if line.starts_with("REMOVED") {
        Style::new().red()
    } else if line.starts_with("CHANGED") {
        Style::new().yellow()
    } else {
        return line.to_owned();
    };
    style.apply_to(line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use featlock_runtime::RuntimeError;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"status": "written"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"status\""));
        assert!(result.contains("\"written\""));
    }

    #[test]
    fn colorize_keeps_text() {
        for line in ["NEW feature a -> b (version 1)", "REMOVED feature a", "CHANGED a: x"] {
            assert!(colorize_drift(line).contains(line));
        }
        assert_eq!(colorize_drift("other"), "other");
    }

    #[test]
    fn exit_codes_distinguish_drift_from_missing_lock() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_ne!(EXIT_DRIFT, EXIT_MISSING_LOCK);
    }

    #[test]
    fn registry_failure_keeps_command_exit_code() {
        let err = CoreError::Digest {
            reference: "ghcr.io/x:1".to_owned(),
            source: RuntimeError::CommandFailed {
                command: "crane digest ghcr.io/x:1".to_owned(),
                code: Some(42),
                stderr: "UNAUTHORIZED\n".to_owned(),
            },
        };
        let failure = Failure::from(err);
        assert_eq!(failure.code, 42);
        assert_eq!(failure.detail.as_deref(), Some("UNAUTHORIZED"));
        assert!(failure.message.contains("crane digest ghcr.io/x:1"));
    }

    #[test]
    fn unusable_exit_codes_fall_back_to_failure() {
        assert_eq!(exit_code_of(None), EXIT_FAILURE);
        assert_eq!(exit_code_of(Some(0)), EXIT_FAILURE);
        assert_eq!(exit_code_of(Some(300)), EXIT_FAILURE);
        assert_eq!(exit_code_of(Some(7)), 7);
    }

    #[test]
    fn spinner_lifecycle() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
