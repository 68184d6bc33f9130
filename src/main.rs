use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use futures_util::future::join_all;
use git_sync::Config;
use git_sync::RealApp;
use git_sync::Settings;
use git_sync::config::AmbientEnv;
use git_sync::config::PhaseOrder;
use git_sync::config::RepositoryConfig;
use git_sync::lock::LockManager;
use git_sync::ops::alert::Alerter;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "git-sync")]
#[command(about = "Keep git working copies in sync with their upstream", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Commit local changes, rebase onto the upstream and push
    Sync {
        #[command(flatten)]
        targets: Targets,
        /// Whether local changes are committed before or after the rebase
        #[arg(long, value_enum)]
        order: Option<PhaseOrder>,
        /// Log conflicts instead of raising a desktop notification
        #[arg(long)]
        no_notify: bool,
    },
    /// Show upstream, rebase and lock state
    Status {
        #[command(flatten)]
        targets: Targets,
    },
    /// Remove a lock file left behind by a crashed run
    Unlock {
        #[command(flatten)]
        targets: Targets,
    },
}

#[derive(Args)]
pub struct Targets {
    /// JSON file listing repositories
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// git binary to use for repositories given on the command line
    #[arg(long)]
    git_exec: Option<String>,
    /// KEY=VALUE passed to git for repositories given on the command line
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,
    /// Repository paths
    paths: Vec<PathBuf>,
}

impl Targets {
    /// The config file (or defaults) plus the command-line repositories.
    fn resolve(self) -> Result<(Config, Vec<RepositoryConfig>)> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        let mut repos = std::mem::take(&mut config.repos);
        for path in self.paths {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Invalid repository path {}", path.display()))?;
            let mut repo = RepositoryConfig::new(path).with_env(self.env.clone());
            repo.git_exec = self.git_exec.clone();
            repos.push(repo);
        }
        if repos.is_empty() {
            bail!("No repositories given. Pass paths or --config <FILE>.");
        }
        Ok((config, repos))
    }
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

fn settings(config: &Config, order: Option<PhaseOrder>, notify: bool) -> Result<Settings> {
    let ambient = AmbientEnv::capture();
    let locks = LockManager::new(ambient.cache_dir()?);
    Ok(Settings {
        ambient,
        locks,
        order: order.unwrap_or(config.order),
        alerter: if notify && config.notify {
            Alerter::Desktop
        } else {
            Alerter::Log
        },
        fallback_identity: config.fallback_identity.clone(),
    })
}

fn apps(targets: Targets, order: Option<PhaseOrder>, notify: bool) -> Result<Vec<RealApp>> {
    let (config, repos) = targets.resolve()?;
    let settings = settings(&config, order, notify)?;
    repos
        .into_iter()
        .map(|repo| RealApp::real(repo, &settings))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Sync {
            targets,
            order,
            no_notify,
        } => {
            let apps = apps(targets, order, !no_notify)?;
            // Distinct repositories never share a lock, so they run concurrently
            let reports = join_all(apps.iter().map(|app| async move {
                let mut out = Vec::new();
                let ok = app.cmd_sync(&mut out).await;
                (out, ok)
            }))
            .await;

            let mut all_ok = true;
            for (out, ok) in reports {
                stdout.write_all(&out)?;
                all_ok &= ok?;
            }
            if !all_ok {
                stdout.flush()?;
                std::process::exit(1);
            }
        }
        Commands::Status { targets } => {
            for app in apps(targets, None, false)? {
                app.cmd_status(&mut stdout).await?;
            }
        }
        Commands::Unlock { targets } => {
            for app in apps(targets, None, false)? {
                app.cmd_unlock(&mut stdout)?;
            }
        }
    }

    Ok(())
}
