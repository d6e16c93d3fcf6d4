use std::path::PathBuf;

use tracing::debug;

use crate::config::GitHubConfig;
use crate::error::{PaneError, Result};

/// Try to run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

/// Stored token path: ~/.config/issuepane/token
fn token_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("issuepane").join("token"))
}

fn read_token_file(path: PathBuf) -> Option<String> {
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Load a GitHub token, trying in order:
/// 1. env var named in config
/// 2. stored token file
/// 3. token command from config
pub fn load_token(config: &GitHubConfig) -> Result<String> {
    if let Some(env_var) = &config.token_env {
        if let Ok(token) = std::env::var(env_var) {
            if !token.is_empty() {
                debug!(env_var, "using token from environment");
                return Ok(token);
            }
        }
    }

    if let Some(token) = token_path().and_then(read_token_file) {
        debug!("using stored token");
        return Ok(token);
    }

    if let Some(cmd) = &config.token_command {
        if let Some(token) = try_cli_token(cmd) {
            debug!(cmd, "using token from command");
            return Ok(token);
        }
    }

    Err(PaneError::Auth(format!(
        "No GitHub token found. Set {} or configure a token_command.",
        config.token_env.as_deref().unwrap_or("a token env var")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_token_is_trimmed() {
        assert_eq!(try_cli_token("printf ' tok123 \\n'"), Some("tok123".to_string()));
    }

    #[test]
    fn failing_or_empty_command_yields_none() {
        assert_eq!(try_cli_token("exit 1"), None);
        assert_eq!(try_cli_token("true"), None);
    }

    #[test]
    fn env_var_takes_precedence() {
        let var = "ISSUEPANE_TEST_TOKEN_ENV_PRECEDENCE";
        std::env::set_var(var, "from-env");
        let config = GitHubConfig {
            api_url: None,
            token_env: Some(var.to_string()),
            token_command: Some("printf from-command".to_string()),
        };
        assert_eq!(load_token(&config).unwrap(), "from-env");
        std::env::remove_var(var);
    }

    #[test]
    fn missing_file_is_none() {
        assert_eq!(read_token_file(PathBuf::from("/nonexistent/issuepane/token")), None);
    }
}
