#![allow(dead_code)]

use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use git_sync::App;
use git_sync::RealApp;
use git_sync::Settings;
use git_sync::clients::git::GitClient;
use git_sync::config::AmbientEnv;
use git_sync::config::PhaseOrder;
use git_sync::config::RepositoryConfig;
use git_sync::lock::LockManager;
use git_sync::ops::alert::AlertOps;
use git_sync::ops::alert::Alerter;
use git_sync::ops::filter::GitIgnoreFilter;
use git_sync::ops::git::RealGit;
use git_sync::ops::identity::GitIdentity;
use tokio::process::Command;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Runs git in `dir`, failing on a non-zero exit.
pub async fn git(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    anyhow::ensure!(status.success(), "git {} failed", args.join(" "));
    Ok(())
}

/// Runs git in `dir` and returns its stdout without trailing whitespace.
pub async fn git_output(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await?;
    anyhow::ensure!(output.status.success(), "git {} failed", args.join(" "));
    Ok(String::from_utf8(output.stdout)?.trim_end().to_string())
}

/// Sets the author identity used for commits in `dir`.
pub async fn configure_author(dir: &Path) -> anyhow::Result<()> {
    git(dir, &["config", "user.name", "Test User"]).await?;
    git(dir, &["config", "user.email", "test@example.com"]).await?;
    git(dir, &["config", "commit.gpgsign", "false"]).await?;
    Ok(())
}

/// Creates a git repository with an author configured and no remote.
pub async fn create_git_repo(dir: &Path) -> anyhow::Result<()> {
    git(dir, &["init", "-b", "main"]).await?;
    configure_author(dir).await
}

/// Writes `contents` to `filename` in `dir` and commits it.
pub async fn commit_file(
    dir: &Path,
    filename: &str,
    contents: &str,
    message: &str,
) -> anyhow::Result<()> {
    tokio::fs::write(dir.join(filename), contents).await?;
    git(dir, &["add", "-f", "--", filename]).await?;
    git(dir, &["commit", "-m", message]).await?;
    Ok(())
}

/// Creates a bare remote at `<root>/remote.git` seeded with `notes.md`, and
/// returns its path.
pub async fn create_remote(root: &Path) -> anyhow::Result<PathBuf> {
    let remote = root.join("remote.git");
    let seed = root.join("seed");
    tokio::fs::create_dir_all(&remote).await?;
    tokio::fs::create_dir_all(&seed).await?;

    git(&remote, &["init", "--bare", "-b", "main"]).await?;
    create_git_repo(&seed).await?;
    commit_file(&seed, "notes.md", "first line\n", "Initial").await?;
    let remote_url = remote.display().to_string();
    git(&seed, &["remote", "add", "origin", &remote_url]).await?;
    git(&seed, &["push", "-u", "origin", "main"]).await?;

    Ok(remote)
}

/// Clones `remote` into `<root>/<name>` with upstream tracking set up.
pub async fn clone_remote(root: &Path, remote: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let dir = root.join(name);
    let remote_url = remote.display().to_string();
    let dir_str = dir.display().to_string();
    git(root, &["clone", &remote_url, &dir_str]).await?;
    configure_author(&dir).await?;
    Ok(dir)
}

/// Subject and body of the last commit.
pub async fn last_commit_message(dir: &Path) -> anyhow::Result<String> {
    git_output(dir, &["log", "-1", "--format=%B"]).await
}

pub fn settings(cache: &Path) -> Settings {
    Settings {
        ambient: AmbientEnv::capture(),
        locks: LockManager::new(cache),
        order: PhaseOrder::CommitFirst,
        alerter: Alerter::Log,
        fallback_identity: None,
    }
}

pub fn real_app(repo: &Path, cache: &Path) -> anyhow::Result<RealApp> {
    RealApp::real(RepositoryConfig::new(repo), &settings(cache))
}

/// Records alerts instead of showing them.
#[derive(Default)]
pub struct RecordingAlert {
    pub alerts: Mutex<Vec<(String, String)>>,
}

impl AlertOps for RecordingAlert {
    async fn alert(&self, title: &str, message: &str) -> anyhow::Result<()> {
        self.alerts
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

pub fn recording_app(
    repo: &Path,
    cache: &Path,
) -> anyhow::Result<App<RealGit, GitIgnoreFilter, GitIdentity, RecordingAlert>> {
    let config = RepositoryConfig::new(repo);
    let client = GitClient::new(config.clone(), &AmbientEnv::capture());
    Ok(App::new(
        config,
        LockManager::new(cache),
        RealGit::new(client.clone()),
        GitIgnoreFilter::new(client.clone())?,
        GitIdentity::new(client, None),
        RecordingAlert::default(),
    ))
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_test_writer()
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
