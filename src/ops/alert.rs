#![allow(async_fn_in_trait)]

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::warn;

// -----------------------------------------------------------------------------
// AlertOps trait

/// User-visible notification.
#[cfg_attr(test, automock)]
pub trait AlertOps {
    async fn alert(&self, title: &str, message: &str) -> Result<()>;
}

// -----------------------------------------------------------------------------
// Alerter

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alerter {
    /// Desktop notification through `notify-send`.
    Desktop,
    /// Only a log event.
    Log,
}

impl AlertOps for Alerter {
    async fn alert(&self, title: &str, message: &str) -> Result<()> {
        warn!(title, "{message}");
        if *self == Self::Log {
            return Ok(());
        }

        let output = Command::new("notify-send")
            .args(["--urgency=critical", title, message])
            .output()
            .await
            .context("Failed to execute notify-send")?;
        if !output.status.success() {
            bail!(
                "notify-send failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }
}
