use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{PaneError, Result};
use crate::types::{IssueStateFilter, RepoRef};
use crate::widget::DEFAULT_PAGE_SIZE;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST/GraphQL base; GraphQL requests go to `{api_url}/graphql`.
    pub api_url: Option<String>,
    pub token_env: Option<String>,
    pub token_command: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            token_env: Some("GITHUB_TOKEN".to_string()),
            token_command: Some("gh auth token".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IssuesConfig {
    pub page_size: u32,
    pub state: IssueStateFilter,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            state: IssueStateFilter::Open,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub issues: IssuesConfig,
}

pub fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("issuepane").join("config.toml"))
}

impl Config {
    /// Load from `path`, or the default location. A missing or unreadable
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        match toml::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Config::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let size = self.issues.page_size;
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(PaneError::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, size
            )));
        }
        Ok(())
    }
}

/// Work out `owner/repo` from the `origin` remote of the current directory.
pub fn detect_repo() -> Result<RepoRef> {
    let output = std::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .output()?;

    if !output.status.success() {
        return Err(PaneError::Config(
            "no OWNER/REPO given and no git remote 'origin' found".to_string(),
        ));
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    parse_remote(&url)
        .ok_or_else(|| PaneError::Config(format!("cannot parse remote url '{}'", url)))
}

/// Extract owner/repo from SSH (git@host:o/r.git), ssh:// or HTTPS remotes
fn parse_remote(url: &str) -> Option<RepoRef> {
    let path = if let Some(rest) = url.strip_prefix("git@") {
        // SSH: git@host:owner/repo.git
        rest.split_once(':')?.1
    } else if url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("ssh://")
    {
        // scheme://[user@]host[:port]/owner/repo.git
        let without_scheme = url.split("://").nth(1)?;
        without_scheme.split_once('/')?.1
    } else {
        return None;
    };
    RepoRef::parse(path)
}
