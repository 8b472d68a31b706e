use crate::fallback::first_non_empty;
use std::collections::BTreeMap;
use std::fmt;
use std::process::{Command, Stdio};
use tracing::debug;

/// A tool name and the fixed command line that reports its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCommand {
    pub tool: &'static str,
    pub argv: &'static [&'static str],
}

impl ProbeCommand {
    pub const fn new(tool: &'static str, argv: &'static [&'static str]) -> Self {
        Self { tool, argv }
    }
}

impl fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Runs a version probe. `None` means "no data": the tool is missing,
/// exited non-zero, or printed nothing.
pub trait ProbeRunner: Send + Sync {
    fn probe(&self, argv: &[&str]) -> Option<String>;
}

impl<T: ProbeRunner + ?Sized> ProbeRunner for std::sync::Arc<T> {
    fn probe(&self, argv: &[&str]) -> Option<String> {
        (**self).probe(argv)
    }
}

/// Probes by spawning the command on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandProber;

impl ProbeRunner for CommandProber {
    fn probe(&self, argv: &[&str]) -> Option<String> {
        let (program, args) = argv.split_first()?;
        let output = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                debug!("probe {} unavailable: {e}", argv.join(" "));
                return None;
            }
        };
        if !output.status.success() {
            debug!("probe {} exited with {}", argv.join(" "), output.status);
            return None;
        }

        let stdout = || Some(String::from_utf8_lossy(&output.stdout).trim().to_owned());
        let stderr = || Some(String::from_utf8_lossy(&output.stderr).trim().to_owned());
        first_non_empty::<String>(&[&stdout, &stderr])
    }
}

/// Run every probe and keep the tools that reported something.
pub fn collect_runtime_versions(
    prober: &dyn ProbeRunner,
    probes: &[ProbeCommand],
) -> BTreeMap<String, String> {
    probes
        .iter()
        .filter_map(|p| prober.probe(p.argv).map(|v| (p.tool.to_owned(), v)))
        .collect()
}
