use anyhow::Result;

use crate::clients::git::GitClient;
use crate::config::AmbientEnv;
use crate::config::Identity;
use crate::config::PhaseOrder;
use crate::config::RepositoryConfig;
use crate::lock::LockManager;
use crate::ops::alert::Alerter;
use crate::ops::filter::GitIgnoreFilter;
use crate::ops::git::RealGit;
use crate::ops::identity::GitIdentity;

/// Title of the desktop alert raised on a rebase conflict.
pub const CONFLICT_ALERT_TITLE: &str = "Git Auto Sync - Conflict";

/// Everything needed to sync one repository.
pub struct App<G, F, I, A> {
    pub repo: RepositoryConfig,
    pub order: PhaseOrder,
    pub locks: LockManager,
    pub git: G,
    pub filter: F,
    pub identity: I,
    pub alert: A,
}

/// An [`App`] wired to the real git binary.
pub type RealApp = App<RealGit, GitIgnoreFilter, GitIdentity, Alerter>;

/// Settings shared by every repository in one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ambient: AmbientEnv,
    pub locks: LockManager,
    pub order: PhaseOrder,
    pub alerter: Alerter,
    pub fallback_identity: Option<Identity>,
}

impl<G, F, I, A> App<G, F, I, A> {
    pub fn new(
        repo: RepositoryConfig,
        locks: LockManager,
        git: G,
        filter: F,
        identity: I,
        alert: A,
    ) -> Self {
        Self {
            repo,
            order: PhaseOrder::default(),
            locks,
            git,
            filter,
            identity,
            alert,
        }
    }

    pub fn with_order(mut self, order: PhaseOrder) -> Self {
        self.order = order;
        self
    }
}

impl RealApp {
    pub fn real(repo: RepositoryConfig, settings: &Settings) -> Result<Self> {
        repo.validate()?;
        let client = GitClient::new(repo.clone(), &settings.ambient);
        Ok(App::new(
            repo,
            settings.locks.clone(),
            RealGit::new(client.clone()),
            GitIgnoreFilter::new(client.clone())?,
            GitIdentity::new(client, settings.fallback_identity.clone()),
            settings.alerter,
        )
        .with_order(settings.order))
    }
}
