use anyhow::Context;
use anyhow::Result;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::App;
use crate::ops::filter::ChangeFilter;
use crate::ops::git::GitOps;
use crate::status::StatusEntry;

/// Result of [`App::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing left to commit after filtering.
    Unchanged,
    Committed { message: String },
}

impl<G: GitOps, F: ChangeFilter, I, A> App<G, F, I, A> {
    /// Stage every changed path the filter lets through and commit them in
    /// one commit whose message lists `<status> <path>` per line, sorted.
    #[instrument(skip_all, fields(repo = %self.repo.repo_path.display()))]
    pub async fn commit(&self) -> Result<CommitOutcome> {
        let status = self
            .git
            .status_porcelain()
            .await
            .context("Failed to list local changes")?;
        let entries = StatusEntry::parse_all(&status)?;

        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            if self
                .filter
                .should_ignore_file(&self.repo.repo_path, &entry.path)
                .await?
            {
                debug!(path = entry.path, "ignored");
                continue;
            }

            // One path that cannot be staged must not block the rest
            if let Err(err) = self.git.add(&entry.path).await {
                warn!(path = entry.path, "git add skipped: {err}");
                continue;
            }
            lines.push(entry.summary());
        }

        if lines.is_empty() {
            debug!("nothing to commit");
            return Ok(CommitOutcome::Unchanged);
        }

        lines.sort();
        let message = lines.join("\n");
        self.git
            .commit(&message)
            .await
            .context("Failed to commit local changes")?;
        info!(files = lines.len(), "committed local changes");

        Ok(CommitOutcome::Committed { message })
    }
}
