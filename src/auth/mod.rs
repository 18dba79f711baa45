//! Authentication for GitHub
//!
//! Supports an explicit token (flag or `GITHUB_TOKEN`) and the `gh` CLI.

use crate::error::{Error, Result};
use tokio::process::Command;
use tracing::debug;

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from CLI tool (gh)
    Cli,
    /// Token from flag or environment variable
    EnvVar,
}

/// GitHub credentials
#[derive(Clone)]
pub struct GitHubAuthConfig {
    /// API token
    pub token: String,
    /// Where the token came from
    pub source: AuthSource,
}

impl std::fmt::Debug for GitHubAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuthConfig")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Resolve a GitHub token
///
/// An explicit non-empty token wins. Otherwise ask `gh auth token`.
pub async fn get_github_auth(explicit: Option<&str>) -> Result<GitHubAuthConfig> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        debug!(source = ?AuthSource::EnvVar, "using GitHub token");
        return Ok(GitHubAuthConfig {
            token: token.to_string(),
            source: AuthSource::EnvVar,
        });
    }

    let token = gh_cli_token().await?;
    debug!(source = ?AuthSource::Cli, "using GitHub token");
    Ok(GitHubAuthConfig {
        token,
        source: AuthSource::Cli,
    })
}

async fn gh_cli_token() -> Result<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .map_err(|e| {
            Error::Auth(format!(
                "no GitHub token given and `gh` could not be run ({e}); set GITHUB_TOKEN"
            ))
        })?;

    if !output.status.success() {
        return Err(Error::Auth(
            "no GitHub token given and `gh auth token` failed; set GITHUB_TOKEN or run `gh auth login`"
                .to_string(),
        ));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Auth("`gh auth token` returned an empty token".to_string()));
    }
    Ok(token)
}
