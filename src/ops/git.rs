#![allow(async_fn_in_trait)]

use anyhow::Result;
#[cfg(test)]
use mockall::automock;

use crate::clients::git::BranchInfo;
use crate::clients::git::CommandError;
use crate::clients::git::GitClient;

// -----------------------------------------------------------------------------
// GitOps trait

/// Git operations used by the committer and the sync orchestrator.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Raw `git status --porcelain` output, one line per file (untracked
    /// directories are expanded).
    async fn status_porcelain(&self) -> Result<String, CommandError>;
    async fn add(&self, path: &str) -> Result<(), CommandError>;
    async fn commit(&self, message: &str) -> Result<(), CommandError>;

    /// Upstream of the current branch; empty fields when untracked.
    async fn branch_info(&self) -> Result<BranchInfo>;
    async fn fetch(&self, remote: &str) -> Result<(), CommandError>;
    /// Rebase the current branch onto [`BranchInfo::rebase_target`].
    async fn rebase(&self, upstream: &BranchInfo, autostash: bool) -> Result<(), CommandError>;
    /// Whether a rebase is currently in progress.
    async fn is_rebasing(&self) -> Result<bool>;
    async fn rebase_abort(&self) -> Result<(), CommandError>;

    /// Push HEAD to the upstream, or a plain `git push` when untracked.
    async fn push(&self, upstream: &BranchInfo) -> Result<(), CommandError>;
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
#[derive(Clone)]
pub struct RealGit {
    client: GitClient,
}

impl RealGit {
    pub fn new(client: GitClient) -> Self {
        Self { client }
    }
}

impl GitOps for RealGit {
    async fn status_porcelain(&self) -> Result<String, CommandError> {
        let output = self
            .client
            .run(&["status", "--porcelain", "--untracked-files=all"])
            .await?;
        Ok(output.stdout_str())
    }

    async fn add(&self, path: &str) -> Result<(), CommandError> {
        self.client.run(&["add", "--", path]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), CommandError> {
        self.client.run(&["commit", "-m", message]).await?;
        Ok(())
    }

    async fn branch_info(&self) -> Result<BranchInfo> {
        self.client.branch_info().await
    }

    async fn fetch(&self, remote: &str) -> Result<(), CommandError> {
        self.client.run(&["fetch", remote]).await?;
        Ok(())
    }

    async fn rebase(&self, upstream: &BranchInfo, autostash: bool) -> Result<(), CommandError> {
        let onto = upstream.rebase_target();
        if autostash {
            self.client.run(&["rebase", "--autostash", &onto]).await?;
        } else {
            self.client.run(&["rebase", &onto]).await?;
        }
        Ok(())
    }

    async fn is_rebasing(&self) -> Result<bool> {
        self.client.is_rebasing().await
    }

    async fn rebase_abort(&self) -> Result<(), CommandError> {
        self.client.run(&["rebase", "--abort"]).await?;
        Ok(())
    }

    async fn push(&self, upstream: &BranchInfo) -> Result<(), CommandError> {
        if upstream.is_tracked() {
            let refspec = format!("HEAD:{}", upstream.upstream_branch);
            self.client
                .run(&["push", &upstream.upstream_remote, &refspec])
                .await?;
        } else {
            self.client.run(&["push"]).await?;
        }
        Ok(())
    }
}
