//! Per-repository lock files.
//!
//! The lock is a plain file under `<home>/.cache` named after the repository
//! path. Its existence is the lock state, so cooperating scripts that use the
//! same naming scheme are excluded as well.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use tracing::debug;
use tracing::warn;

/// Creates and inspects lock files in one directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    dir: PathBuf,
}

/// A held lock. The file is removed when this is dropped.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    released: bool,
}

impl LockManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `repo_path`: `git-sync-<path with '/' replaced by '-'>.lock`.
    pub fn lock_file_name(repo_path: &Path) -> String {
        let path = repo_path.to_string_lossy().replace('/', "-");
        format!("git-sync-{path}.lock")
    }

    pub fn lock_path(&self, repo_path: &Path) -> PathBuf {
        self.dir.join(Self::lock_file_name(repo_path))
    }

    /// Try to take the lock for `repo_path`.
    ///
    /// Returns `Ok(None)` when the lock file already exists, whoever owns it.
    pub fn acquire(&self, repo_path: &Path) -> Result<Option<RepoLock>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create lock directory {}", self.dir.display()))?;

        let path = self.lock_path(repo_path);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => {
                debug!(lock = %path.display(), "lock acquired");
                Ok(Some(RepoLock {
                    path,
                    released: false,
                }))
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!(lock = %path.display(), "lock busy");
                Ok(None)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to create lock file {}", path.display()))
            }
        }
    }

    pub fn is_locked(&self, repo_path: &Path) -> bool {
        self.lock_path(repo_path).exists()
    }

    /// Remove a lock left behind by a run that never finished.
    ///
    /// Returns whether a lock file was present.
    pub fn force_unlock(&self, repo_path: &Path) -> Result<bool> {
        let path = self.lock_path(repo_path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to remove lock file {}", path.display()))
            }
        }
    }
}

impl RepoLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove lock file {}", self.path.display()))
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = fs::remove_file(&self.path)
        {
            warn!(lock = %self.path.display(), "failed to remove lock file: {err}");
        }
    }
}
