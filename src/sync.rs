use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::App;
use crate::app::CONFLICT_ALERT_TITLE;
use crate::clients::git::BranchInfo;
use crate::config::PhaseOrder;
use crate::error::Phase;
use crate::error::SyncError;
use crate::ops::alert::AlertOps;
use crate::ops::filter::ChangeFilter;
use crate::ops::git::GitOps;
use crate::ops::identity::IdentityOps;

/// Result of a sync run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// The repository lock is held elsewhere; nothing was done.
    Busy,
}

impl<G: GitOps, F: ChangeFilter, I: IdentityOps, A: AlertOps> App<G, F, I, A> {
    /// Run one sync cycle: lock, identity, commit, fetch, rebase, push.
    ///
    /// The lock is held from the identity check through the push and removed
    /// on every exit path. A rebase conflict is aborted, alerted and returned
    /// as [`SyncError::Conflict`]; the local commit stays for the next cycle.
    #[instrument(skip_all, fields(repo = %self.repo.repo_path.display()))]
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let repo_path = &self.repo.repo_path;
        let lock = self
            .locks
            .acquire(repo_path)
            .map_err(|err| self.fail(Phase::Lock, err))?;
        let Some(_lock) = lock else {
            return Ok(SyncOutcome::Busy);
        };

        self.identity
            .ensure_author_identity()
            .await
            .map_err(|err| self.fail(Phase::Identity, err))?;

        let upstream = match self.order {
            PhaseOrder::CommitFirst => {
                self.commit_changes().await?;
                let upstream = self.upstream().await?;
                self.integrate(&upstream, false).await?;
                upstream
            }
            PhaseOrder::IntegrateFirst => {
                let upstream = self.upstream().await?;
                self.integrate(&upstream, true).await?;
                self.commit_changes().await?;
                upstream
            }
        };

        self.git
            .push(&upstream)
            .await
            .map_err(|err| self.fail(Phase::Push, err))?;
        info!(%upstream, "synced");

        Ok(SyncOutcome::Synced)
    }

    async fn commit_changes(&self) -> Result<(), SyncError> {
        self.commit()
            .await
            .map_err(|err| self.fail(Phase::Commit, err))?;
        Ok(())
    }

    async fn upstream(&self) -> Result<BranchInfo, SyncError> {
        self.git
            .branch_info()
            .await
            .map_err(|err| self.fail(Phase::BranchInfo, err))
    }

    /// Fetch the upstream remote and rebase onto it. Skipped when the branch
    /// tracks nothing.
    async fn integrate(&self, upstream: &BranchInfo, autostash: bool) -> Result<(), SyncError> {
        if !upstream.is_tracked() {
            debug!("no upstream, skipping fetch and rebase");
            return Ok(());
        }

        if upstream.is_local() {
            debug!(%upstream, "local upstream, skipping fetch");
        } else {
            self.git
                .fetch(&upstream.upstream_remote)
                .await
                .map_err(|err| self.fail(Phase::Fetch, err))?;
        }

        let Err(rebase_err) = self.git.rebase(upstream, autostash).await else {
            return Ok(());
        };

        let rebasing = match self.git.is_rebasing().await {
            Ok(rebasing) => rebasing,
            Err(err) => {
                warn!("could not determine rebase state: {err:#}");
                false
            }
        };
        if !rebasing {
            return Err(self.fail(Phase::Rebase, rebase_err));
        }

        warn!(%upstream, "rebase stopped on a conflict, aborting");
        if let Err(err) = self.git.rebase_abort().await {
            warn!("rebase --abort failed: {err}");
        }

        let message = format!("Could not rebase for - {}", self.repo.repo_path.display());
        self.alert
            .alert(CONFLICT_ALERT_TITLE, &message)
            .await
            .map_err(|err| self.fail(Phase::Alert, err))?;

        Err(SyncError::Conflict {
            repo_path: self.repo.repo_path.clone(),
            upstream: upstream.to_string(),
        })
    }

    fn fail(&self, phase: Phase, err: impl Into<anyhow::Error>) -> SyncError {
        SyncError::phase(phase, &self.repo.repo_path, err)
    }
}
