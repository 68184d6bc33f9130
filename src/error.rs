use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

use crate::clients::git::CommandError;

/// Phase of a sync run, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lock,
    Identity,
    Commit,
    BranchInfo,
    Fetch,
    Rebase,
    Alert,
    Push,
}

/// Why a sync run did not complete.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The rebase stopped on a conflict and was aborted. The local commit is
    /// kept and the next run will try again.
    #[error("Could not rebase {} onto {upstream}: conflict, rebase aborted", .repo_path.display())]
    Conflict { repo_path: PathBuf, upstream: String },

    #[error("{phase} failed for {}", .repo_path.display())]
    Phase {
        phase: Phase,
        repo_path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    pub fn phase(
        phase: Phase,
        repo_path: impl Into<PathBuf>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Phase {
            phase,
            repo_path: repo_path.into(),
            source: source.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The failed command, if the failure came from one.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            Self::Conflict { .. } => None,
            Self::Phase { source, .. } => source.downcast_ref::<CommandError>(),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lock => "lock",
            Self::Identity => "author identity check",
            Self::Commit => "commit",
            Self::BranchInfo => "upstream lookup",
            Self::Fetch => "fetch",
            Self::Rebase => "rebase",
            Self::Alert => "conflict alert",
            Self::Push => "push",
        })
    }
}
