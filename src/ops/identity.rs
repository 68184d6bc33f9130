#![allow(async_fn_in_trait)]

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::clients::git::GitClient;
use crate::config::Identity;

// -----------------------------------------------------------------------------
// IdentityOps trait

/// Makes sure commits made by the sync have an author.
#[cfg_attr(test, automock)]
pub trait IdentityOps {
    async fn ensure_author_identity(&self) -> Result<()>;
}

// -----------------------------------------------------------------------------
// GitIdentity

/// Checks `user.name` and `user.email`, filling them in from a fallback
/// identity (repository-local) when one is configured.
pub struct GitIdentity {
    client: GitClient,
    fallback: Option<Identity>,
}

impl GitIdentity {
    pub fn new(client: GitClient, fallback: Option<Identity>) -> Self {
        Self { client, fallback }
    }

    async fn ensure_key(&self, key: &str, fallback: Option<&str>) -> Result<()> {
        if self.client.config_value(key).await?.is_some() {
            return Ok(());
        }
        let Some(value) = fallback else {
            bail!(
                "git {key} is not configured for {}",
                self.client.path().display()
            );
        };
        info!(repo = %self.client.path().display(), key, value, "setting fallback author");
        self.client
            .run(&["config", key, value])
            .await
            .with_context(|| format!("Failed to set git {key}"))?;
        Ok(())
    }
}

impl IdentityOps for GitIdentity {
    async fn ensure_author_identity(&self) -> Result<()> {
        let fallback = self.fallback.as_ref();
        self.ensure_key("user.name", fallback.map(|id| id.name.as_str()))
            .await?;
        self.ensure_key("user.email", fallback.map(|id| id.email.as_str()))
            .await?;
        Ok(())
    }
}
