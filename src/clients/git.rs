use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::AmbientEnv;
use crate::config::RepositoryConfig;

/// Remote name git records for an upstream in the same repository.
const LOCAL_REMOTE: &str = ".";

// -----------------------------------------------------------------------------
// Types

/// Git client bound to one repository.
///
/// Every call runs `<git_exec> <args..>` with the repository as working
/// directory and the environment derived from [`RepositoryConfig::env`].
#[derive(Clone)]
pub struct GitClient {
    repo: Arc<RepositoryConfig>,
    env: Arc<Vec<(String, String)>>,
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// A failed invocation, with everything the tool reported.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{status}: Command: {command}\nStdOut: {}\nStdErr: {}",
        String::from_utf8_lossy(.stdout),
        String::from_utf8_lossy(.stderr)
    )]
    Failed {
        command: String,
        status: ExitState,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
}

/// Exit status of a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Code(i32),
    Signal,
}

/// Upstream tracked by the current branch. Both fields are empty when the
/// branch tracks nothing (or HEAD is detached).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchInfo {
    pub upstream_remote: String,
    pub upstream_branch: String,
}

// -----------------------------------------------------------------------------
// GitClient impl

impl GitClient {
    pub fn new(repo: RepositoryConfig, ambient: &AmbientEnv) -> Self {
        let env = repo.subprocess_env(ambient);
        Self {
            repo: Arc::new(repo),
            env: Arc::new(env),
        }
    }

    pub fn repo(&self) -> &RepositoryConfig {
        &self.repo
    }

    pub fn path(&self) -> &Path {
        &self.repo.repo_path
    }

    /// Run the version-control binary with `args`.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandOutput, CommandError> {
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        let exec = self.repo.git_exec();
        let command = Self::command_line(exec, &args);
        debug!(repo = %self.path().display(), %command, "running");

        let output = Command::new(exec)
            .current_dir(self.path())
            .args(&args)
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                command,
                status: output.status.into(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Like [`Self::run`], but a non-zero exit is reported as `Ok(None)`
    /// rather than an error. Used for queries where "not found" is an answer.
    pub async fn run_optional<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<Option<CommandOutput>, CommandError> {
        match self.run(args).await {
            Ok(output) => Ok(Some(output)),
            Err(CommandError::Failed {
                status: ExitState::Code(1),
                ..
            }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Upstream remote and branch of the current branch.
    pub async fn branch_info(&self) -> Result<BranchInfo> {
        let head = self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .context("Failed to resolve current branch")?
            .stdout_trimmed();
        if head.is_empty() || head == "HEAD" {
            debug!(repo = %self.path().display(), "detached HEAD, no upstream");
            return Ok(BranchInfo::default());
        }

        let remote = self.config_value(&format!("branch.{head}.remote")).await?;
        let merge = self.config_value(&format!("branch.{head}.merge")).await?;
        let (Some(remote), Some(merge)) = (remote, merge) else {
            return Ok(BranchInfo::default());
        };

        Ok(BranchInfo {
            upstream_remote: remote,
            upstream_branch: merge
                .strip_prefix("refs/heads/")
                .unwrap_or(&merge)
                .to_string(),
        })
    }

    /// Whether a rebase is in progress, judged by git's own state directories.
    pub async fn is_rebasing(&self) -> Result<bool> {
        let git_dir = self
            .run(&["rev-parse", "--git-dir"])
            .await
            .context("Failed to locate git directory")?
            .stdout_trimmed();
        let git_dir = self.path().join(PathBuf::from(git_dir));

        for marker in ["rebase-merge", "rebase-apply"] {
            if tokio::fs::try_exists(git_dir.join(marker))
                .await
                .with_context(|| format!("Failed to inspect {}", git_dir.display()))?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read a single git config value, `None` when unset.
    pub async fn config_value(&self, key: &str) -> Result<Option<String>> {
        let output = self
            .run_optional(&["config", "--get", key])
            .await
            .with_context(|| format!("Failed to read git config {key}"))?;
        Ok(output
            .map(|output| output.stdout_trimmed())
            .filter(|value| !value.is_empty()))
    }

    fn command_line(exec: &str, args: &[&str]) -> String {
        std::iter::once(exec)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// -----------------------------------------------------------------------------
// CommandOutput impl

impl CommandOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stdout_trimmed(&self) -> String {
        self.stdout_str().trim().to_string()
    }
}

// -----------------------------------------------------------------------------
// CommandError impl

impl CommandError {
    /// A non-zero exit, for callers that synthesize failures.
    pub fn failed(command: impl Into<String>, code: i32, stdout: &str, stderr: &str) -> Self {
        Self::Failed {
            command: command.into(),
            status: ExitState::Code(code),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. } | Self::Failed { command, .. } => command,
        }
    }
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Code(code),
            None => Self::Signal,
        }
    }
}

impl Display for ExitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit status {code}"),
            Self::Signal => f.write_str("terminated by signal"),
        }
    }
}

// -----------------------------------------------------------------------------
// BranchInfo impl

impl BranchInfo {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            upstream_remote: remote.into(),
            upstream_branch: branch.into(),
        }
    }

    /// Both remote and branch are known.
    pub fn is_tracked(&self) -> bool {
        !self.upstream_remote.is_empty() && !self.upstream_branch.is_empty()
    }

    /// The upstream is a branch of this repository (`branch.<name>.remote = .`),
    /// so there is nothing to fetch.
    pub fn is_local(&self) -> bool {
        self.upstream_remote == LOCAL_REMOTE
    }

    /// Revision to rebase onto: `<remote>/<branch>`, or just `<branch>` for a
    /// local upstream.
    pub fn rebase_target(&self) -> String {
        if self.is_local() {
            self.upstream_branch.clone()
        } else {
            format!("{}/{}", self.upstream_remote, self.upstream_branch)
        }
    }
}

impl Display for BranchInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_tracked() {
            f.write_str(&self.rebase_target())
        } else {
            f.write_str("(untracked)")
        }
    }
}
