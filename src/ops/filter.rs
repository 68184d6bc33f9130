#![allow(async_fn_in_trait)]

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use regex::Regex;

use crate::clients::git::GitClient;

// -----------------------------------------------------------------------------
// ChangeFilter trait

/// Decides which changed paths are left out of automatic commits.
#[cfg_attr(test, automock)]
pub trait ChangeFilter {
    /// `path` is relative to `repo_root`.
    async fn should_ignore_file(&self, repo_root: &Path, path: &str) -> Result<bool>;
}

// -----------------------------------------------------------------------------
// GitIgnoreFilter

/// Skips editor scratch files and anything matched by the repository's
/// ignore rules, tracked or not.
pub struct GitIgnoreFilter {
    client: GitClient,
    scratch: Regex,
}

impl GitIgnoreFilter {
    pub fn new(client: GitClient) -> Result<Self> {
        // vim swap files, vim's write probe, emacs lock and autosave files, backups
        let scratch = Regex::new(r"^(\..+\.sw[a-p]|4913|\.#.*|#.*#|.*~)$")
            .context("Invalid scratch file pattern")?;
        Ok(Self { client, scratch })
    }

    fn is_scratch_file(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.scratch.is_match(name)
    }
}

impl ChangeFilter for GitIgnoreFilter {
    async fn should_ignore_file(&self, repo_root: &Path, path: &str) -> Result<bool> {
        if self.is_scratch_file(path) {
            return Ok(true);
        }

        // Exit code 0 means ignored, 1 means not ignored
        let output = self
            .client
            .run_optional(&["check-ignore", "-q", "--no-index", "--", path])
            .await
            .with_context(|| {
                format!(
                    "Failed to check ignore rules for {path} in {}",
                    repo_root.display()
                )
            })?;
        Ok(output.is_some())
    }
}
