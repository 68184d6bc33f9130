use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use serde::Serialize;

/// Default version-control binary.
pub const DEFAULT_GIT_EXEC: &str = "git";

/// Ambient variables still passed to subprocesses when a repository carries
/// its own `env` list.
pub const PRESERVED_ENV_VARS: [&str; 3] = ["HOME", "PATH", "SSH_AUTH_SOCK"];

/// One synchronization target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    pub repo_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_exec: Option<String>,
    /// `KEY=VALUE` overrides. When non-empty, replaces the inherited environment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

/// Order in which local changes are committed relative to integrating the
/// upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseOrder {
    /// commit → fetch → rebase → push
    #[default]
    CommitFirst,
    /// fetch → rebase --autostash → commit → push
    IntegrateFirst,
}

/// Contents of a `--config` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub repos: Vec<RepositoryConfig>,
    #[serde(default)]
    pub order: PhaseOrder,
    #[serde(default = "default_notify")]
    pub notify: bool,
    /// Written to the repository-local git config when no author is set.
    #[serde(default)]
    pub fallback_identity: Option<Identity>,
}

/// Commit author name and email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

fn default_notify() -> bool {
    true
}

/// Snapshot of the process environment, taken once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientEnv {
    vars: Vec<(String, String)>,
}

// -----------------------------------------------------------------------------
// RepositoryConfig impl

impl RepositoryConfig {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            git_exec: None,
            env: Vec::new(),
        }
    }

    pub fn with_git_exec(mut self, git_exec: impl Into<String>) -> Self {
        self.git_exec = Some(git_exec.into());
        self
    }

    pub fn with_env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }

    /// The binary to invoke: the override if configured, else `git`.
    pub fn git_exec(&self) -> &str {
        match self.git_exec.as_deref() {
            Some(exec) if !exec.is_empty() => exec,
            _ => DEFAULT_GIT_EXEC,
        }
    }

    /// Environment handed to every subprocess for this repository.
    ///
    /// Without overrides the full ambient environment is inherited. With
    /// overrides only those plus [`PRESERVED_ENV_VARS`] are passed.
    pub fn subprocess_env(&self, ambient: &AmbientEnv) -> Vec<(String, String)> {
        if self.env.is_empty() {
            return ambient.vars.clone();
        }

        let mut vars: Vec<(String, String)> = self
            .env
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry.clone(), String::new()),
            })
            .collect();
        vars.extend(
            ambient
                .vars
                .iter()
                .filter(|(key, _)| PRESERVED_ENV_VARS.contains(&key.as_str()))
                .cloned(),
        );
        vars
    }

    pub fn validate(&self) -> Result<()> {
        if !self.repo_path.is_absolute() {
            bail!(
                "Repository path must be absolute: {}",
                self.repo_path.display()
            );
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Config impl

impl Config {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        for repo in &config.repos {
            repo.validate()?;
        }
        Ok(config)
    }
}

// -----------------------------------------------------------------------------
// AmbientEnv impl

impl AmbientEnv {
    pub fn new(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }

    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::new(std::env::vars())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Directory holding lock files: `<home>/.cache`.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let home = self
            .get("HOME")
            .filter(|home| !home.is_empty())
            .context("HOME is not set; cannot locate the lock directory")?;
        Ok(PathBuf::from(home).join(".cache"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambient() -> AmbientEnv {
        AmbientEnv::new([
            ("HOME".to_string(), "/home/me".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("SSH_AUTH_SOCK".to_string(), "/tmp/agent".to_string()),
            ("EDITOR".to_string(), "vim".to_string()),
        ])
    }

    #[test]
    fn test_git_exec_defaults_to_git() {
        let repo = RepositoryConfig::new("/repo");
        assert_eq!(repo.git_exec(), "git");
        let repo = repo.with_git_exec("/opt/git/bin/git");
        assert_eq!(repo.git_exec(), "/opt/git/bin/git");
    }

    #[test]
    fn test_subprocess_env_inherits_without_overrides() {
        let repo = RepositoryConfig::new("/repo");
        assert_eq!(repo.subprocess_env(&ambient()).len(), 4);
    }

    #[test]
    fn test_subprocess_env_with_overrides_keeps_allow_list_only() {
        let repo = RepositoryConfig::new("/repo").with_env(vec![
            "GIT_SSH_COMMAND=ssh -i key".to_string(),
            "EMPTY".to_string(),
        ]);
        let env = repo.subprocess_env(&ambient());
        assert_eq!(
            env,
            vec![
                ("GIT_SSH_COMMAND".to_string(), "ssh -i key".to_string()),
                ("EMPTY".to_string(), String::new()),
                ("HOME".to_string(), "/home/me".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
                ("SSH_AUTH_SOCK".to_string(), "/tmp/agent".to_string()),
            ]
        );
    }

    #[test]
    fn test_cache_dir() {
        assert_eq!(
            ambient().cache_dir().unwrap(),
            PathBuf::from("/home/me/.cache")
        );
        assert!(AmbientEnv::default().cache_dir().is_err());
    }

    #[test]
    fn test_config_parse_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"repos":[{"repoPath":"/notes","env":["A=1"]}]}"#).unwrap();
        assert_eq!(config.order, PhaseOrder::CommitFirst);
        assert!(config.notify);
        assert_eq!(config.repos[0].repo_path, PathBuf::from("/notes"));
        assert_eq!(config.repos[0].env, vec!["A=1".to_string()]);
        assert!(config.repos[0].git_exec.is_none());
    }

    #[test]
    fn test_config_parse_order() {
        let config: Config = serde_json::from_str(
            r#"{"order":"integrate-first","notify":false,"fallbackIdentity":{"name":"n","email":"e"}}"#,
        )
        .unwrap();
        assert_eq!(config.order, PhaseOrder::IntegrateFirst);
        assert!(!config.notify);
        assert_eq!(config.fallback_identity.unwrap().name, "n");
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        assert!(RepositoryConfig::new("notes").validate().is_err());
        assert!(RepositoryConfig::new("/notes").validate().is_ok());
    }
}
