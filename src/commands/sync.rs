use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::SyncOutcome;
use crate::commands::error_chain;
use crate::ops::alert::AlertOps;
use crate::ops::filter::ChangeFilter;
use crate::ops::git::GitOps;
use crate::ops::identity::IdentityOps;

impl<G: GitOps, F: ChangeFilter, I: IdentityOps, A: AlertOps> App<G, F, I, A> {
    /// Sync the repository and report the outcome.
    ///
    /// Returns `false` if the run failed or stopped on a conflict.
    pub async fn cmd_sync(&self, stdout: &mut impl std::io::Write) -> Result<bool> {
        let path = self.repo.repo_path.display();
        match self.sync().await {
            Ok(SyncOutcome::Synced) => {
                writeln!(stdout, "{} {}", "synced".green(), path)?;
                Ok(true)
            }
            Ok(SyncOutcome::Busy) => {
                writeln!(stdout, "{} {}", "busy".yellow(), path)?;
                Ok(true)
            }
            Err(err) if err.is_conflict() => {
                writeln!(stdout, "{} {}", "conflict".red().bold(), err)?;
                Ok(false)
            }
            Err(err) => {
                writeln!(stdout, "{} {}", "failed".red().bold(), error_chain(&err))?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::clients::git::BranchInfo;
    use crate::clients::git::CommandError;
    use crate::config::RepositoryConfig;
    use crate::lock::LockManager;
    use crate::ops::alert::MockAlertOps;
    use crate::ops::filter::MockChangeFilter;
    use crate::ops::git::MockGitOps;
    use crate::ops::identity::MockIdentityOps;

    fn app(
        cache: &Path,
        git: MockGitOps,
    ) -> App<MockGitOps, MockChangeFilter, MockIdentityOps, MockAlertOps> {
        let mut identity = MockIdentityOps::new();
        identity
            .expect_ensure_author_identity()
            .returning(|| Ok(()));
        App::new(
            RepositoryConfig::new("/srv/notes"),
            LockManager::new(cache),
            git,
            MockChangeFilter::new(),
            identity,
            MockAlertOps::new(),
        )
    }

    fn untracked_git() -> MockGitOps {
        let mut git = MockGitOps::new();
        git.expect_status_porcelain()
            .returning(|| Ok(String::new()));
        git.expect_branch_info()
            .returning(|| Ok(BranchInfo::default()));
        git
    }

    #[tokio::test]
    async fn test_cmd_sync_reports_synced() {
        let cache = tempfile::tempdir().unwrap();
        let mut git = untracked_git();
        git.expect_push().returning(|_| Ok(()));

        let mut out = Vec::new();
        assert!(app(cache.path(), git).cmd_sync(&mut out).await.unwrap());
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @"synced /srv/notes");
    }

    #[tokio::test]
    async fn test_cmd_sync_reports_busy() {
        let cache = tempfile::tempdir().unwrap();
        let _held = LockManager::new(cache.path())
            .acquire(Path::new("/srv/notes"))
            .unwrap();

        let mut out = Vec::new();
        let app = app(cache.path(), MockGitOps::new());
        assert!(app.cmd_sync(&mut out).await.unwrap());
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @"busy /srv/notes");
    }

    #[tokio::test]
    async fn test_cmd_sync_reports_failure_with_command_output() {
        let cache = tempfile::tempdir().unwrap();
        let mut git = untracked_git();
        git.expect_push().returning(|_| {
            Err(CommandError::failed(
                "git push",
                1,
                "To /srv/remote.git",
                "! [rejected] main -> main (fetch first)",
            ))
        });

        let mut out = Vec::new();
        assert!(!app(cache.path(), git).cmd_sync(&mut out).await.unwrap());
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        failed push failed for /srv/notes
          caused by: exit status 1: Command: git push
            StdOut: To /srv/remote.git
            StdErr: ! [rejected] main -> main (fetch first)
        ");
    }
}
