use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::App;

impl<G, F, I, A> App<G, F, I, A> {
    /// Remove a lock file left behind by a run that died holding it.
    pub fn cmd_unlock(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let repo_path = &self.repo.repo_path;
        if self.locks.force_unlock(repo_path)? {
            info!(repo = %repo_path.display(), "removed lock file");
            writeln!(
                stdout,
                "{} {}",
                "unlocked".green(),
                repo_path.display()
            )?;
        } else {
            writeln!(stdout, "{} {}", "not locked".dimmed(), repo_path.display())?;
        }
        Ok(())
    }
}
