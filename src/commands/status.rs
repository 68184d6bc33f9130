use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::ops::git::GitOps;

impl<G: GitOps, F, I, A> App<G, F, I, A> {
    /// Show upstream, rebase state and lock state without taking the lock.
    pub async fn cmd_status(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let repo_path = &self.repo.repo_path;
        let upstream = self.git.branch_info().await?;
        let rebasing = self.git.is_rebasing().await?;

        writeln!(stdout, "{}", repo_path.display().to_string().cyan())?;
        writeln!(stdout, "  upstream: {}", upstream)?;
        let rebase = if rebasing {
            "in progress".red().to_string()
        } else {
            "none".to_string()
        };
        writeln!(stdout, "  rebase: {}", rebase)?;
        let lock = if self.locks.is_locked(repo_path) {
            format!("held ({})", self.locks.lock_path(repo_path).display())
                .yellow()
                .to_string()
        } else {
            "free".to_string()
        };
        writeln!(stdout, "  lock: {}", lock)?;

        Ok(())
    }
}
