use crate::{SourceError, TagSource};
use std::process::Command;

const PEELED_SUFFIX: &str = "^{}";

/// Lists remote tags with `git ls-remote --tags`.
pub struct GitTagLister {
    git: String,
}

impl GitTagLister {
    pub fn new(git: &str) -> Self {
        Self {
            git: git.to_owned(),
        }
    }
}

impl Default for GitTagLister {
    fn default() -> Self {
        Self::new("git")
    }
}

impl TagSource for GitTagLister {
    fn list_remote_tags(&self, repo: &str) -> Result<Vec<String>, SourceError> {
        let output = Command::new(&self.git)
            .args(["ls-remote", "--tags", repo])
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| SourceError::TagQuery {
                repo: repo.to_owned(),
                diagnostic: format!("{} failed to start: {e}", self.git),
            })?;

        if !output.status.success() {
            return Err(SourceError::TagQuery {
                repo: repo.to_owned(),
                diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(parse_ls_remote(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract refs from `<sha>\t<ref>` lines, folding peeled annotated tags
/// (`refs/tags/v1^{}`) onto their tag name.
pub fn parse_ls_remote(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|r| r.strip_suffix(PEELED_SUFFIX).unwrap_or(r).to_owned())
        .collect()
}
