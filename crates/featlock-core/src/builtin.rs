//! Resolvers for the official devcontainer language features.
//!
//! Each resolver reads the feature's `version` option. A missing option or a
//! "latest" sentinel is resolved against an upstream source; anything else is
//! taken as the version the consumer asked for.

use crate::resolver::{ResolutionError, ResolverDescriptor};
use featlock_runtime::ProbeCommand;
use featlock_schema::{FeatureOptions, ToolVersions};
use featlock_sources::VersionSources;
use serde_json::Value;
use tracing::debug;

pub const GO_VERSION_URL: &str = "https://go.dev/VERSION?m=text";
pub const NODE_INDEX_URL: &str = "https://nodejs.org/dist/index.json";
pub const PNPM_LATEST_URL: &str = "https://registry.npmjs.org/pnpm/latest";
pub const PYTHON_REPO: &str = "https://github.com/python/cpython";
pub const RUST_REPO: &str = "https://github.com/rust-lang/rust";

const GO_PROBES: &[ProbeCommand] = &[ProbeCommand::new("go", &["go", "version"])];

const NODE_PROBES: &[ProbeCommand] = &[
    ProbeCommand::new("node", &["node", "--version"]),
    ProbeCommand::new("npm", &["npm", "--version"]),
    ProbeCommand::new("pnpm", &["pnpm", "--version"]),
];

const PYTHON_PROBES: &[ProbeCommand] = &[
    ProbeCommand::new("python3", &["python3", "--version"]),
    ProbeCommand::new("pipx", &["pipx", "--version"]),
];

const RUST_PROBES: &[ProbeCommand] = &[
    ProbeCommand::new("rustc", &["rustc", "--version"]),
    ProbeCommand::new("cargo", &["cargo", "--version"]),
    ProbeCommand::new("rustup", &["rustup", "--version"]),
];

/// The built-in prefix table, in registration order.
pub fn descriptors() -> [(&'static str, ResolverDescriptor); 4] {
    [
        (
            "ghcr.io/devcontainers/features/go",
            ResolverDescriptor::new("go", GO_PROBES).with_resolver(resolve_go),
        ),
        (
            "ghcr.io/devcontainers/features/node",
            ResolverDescriptor::new("node", NODE_PROBES).with_resolver(resolve_node),
        ),
        (
            "ghcr.io/devcontainers/features/python",
            ResolverDescriptor::new("python", PYTHON_PROBES).with_resolver(resolve_python),
        ),
        (
            "ghcr.io/devcontainers/features/rust",
            ResolverDescriptor::new("rust", RUST_PROBES).with_resolver(resolve_rust),
        ),
    ]
}

/// The declared `version`, defaulting to `latest`.
fn requested_version(options: &FeatureOptions) -> String {
    options
        .get("version")
        .map_or_else(|| "latest".to_owned(), |v| v.as_text())
}

fn is_one_of(value: &str, sentinels: &[&str]) -> bool {
    let lowered = value.to_lowercase();
    sentinels.contains(&lowered.as_str())
}

fn single(tool: &str, version: String) -> ToolVersions {
    ToolVersions::from([(tool.to_owned(), version)])
}

pub fn resolve_go(
    options: &FeatureOptions,
    sources: &VersionSources,
) -> Result<ToolVersions, ResolutionError> {
    let requested = requested_version(options);
    if !is_one_of(&requested, &["", "latest"]) {
        return Ok(single("go", requested));
    }

    let body = sources
        .fetch_text(GO_VERSION_URL)
        .map_err(ResolutionError::from_source("Go latest version"))?;
    let latest = body.lines().next().unwrap_or_default().trim();
    if latest.is_empty() {
        return Err(ResolutionError::Unresolved(format!(
            "failed to resolve Go latest version: empty response from {GO_VERSION_URL}"
        )));
    }
    debug!("latest Go release is {latest}");
    Ok(single("go", latest.to_owned()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeChannel {
    Current,
    Lts,
}

impl NodeChannel {
    fn kind(self) -> &'static str {
        match self {
            NodeChannel::Current => "latest",
            NodeChannel::Lts => "lts",
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn latest_node(sources: &VersionSources, channel: NodeChannel) -> Result<String, ResolutionError> {
    let index: Value = sources
        .fetch_json(NODE_INDEX_URL)
        .map_err(ResolutionError::from_source("Node version"))?;
    let Value::Array(releases) = index else {
        return Err(ResolutionError::Unresolved(
            "unexpected Node index.json format".to_owned(),
        ));
    };

    releases
        .iter()
        .filter(|release| match channel {
            NodeChannel::Current => true,
            NodeChannel::Lts => release.get("lts").is_some_and(is_truthy),
        })
        .find_map(|release| {
            release
                .get("version")
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_owned)
        .ok_or_else(|| {
            ResolutionError::Unresolved(format!(
                "unable to find Node version for kind={}",
                channel.kind()
            ))
        })
}

pub fn resolve_node(
    options: &FeatureOptions,
    sources: &VersionSources,
) -> Result<ToolVersions, ResolutionError> {
    let requested = requested_version(options);
    let node = if is_one_of(&requested, &["", "latest", "node", "current"]) {
        latest_node(sources, NodeChannel::Current)?
    } else if is_one_of(&requested, &["lts", "lts/*"]) {
        latest_node(sources, NodeChannel::Lts)?
    } else {
        requested
    };
    let mut versions = single("node", node);

    // pnpm is only tracked when the consumer asked for it.
    if let Some(pnpm) = options.get("pnpmVersion").filter(|v| v.is_truthy()) {
        let pnpm = pnpm.as_text();
        if pnpm.eq_ignore_ascii_case("latest") {
            let info: Value = sources
                .fetch_json(PNPM_LATEST_URL)
                .map_err(ResolutionError::from_source("pnpm version"))?;
            if let Some(version) = info
                .get("version")
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
            {
                versions.insert("pnpm".to_owned(), version.to_owned());
            }
        } else {
            versions.insert("pnpm".to_owned(), pnpm);
        }
    }
    Ok(versions)
}

pub fn resolve_python(
    options: &FeatureOptions,
    sources: &VersionSources,
) -> Result<ToolVersions, ResolutionError> {
    let requested = requested_version(options);
    if !is_one_of(&requested, &["", "latest", "current"]) {
        return Ok(single("python", requested));
    }
    let latest = sources
        .resolve_latest_tag_version(PYTHON_REPO, "tags/v", 3, ".")
        .map_err(ResolutionError::from_source("Python version"))?;
    Ok(single("python", latest))
}

pub fn resolve_rust(
    options: &FeatureOptions,
    sources: &VersionSources,
) -> Result<ToolVersions, ResolutionError> {
    let requested = requested_version(options);
    if !is_one_of(&requested, &["", "latest", "stable", "lts"]) {
        return Ok(single("rust", requested));
    }
    let latest = sources
        .resolve_latest_tag_version(RUST_REPO, "tags/", 3, ".")
        .map_err(ResolutionError::from_source("Rust version"))?;
    Ok(single("rust", latest))
}
