//! Host connector for GitHub

use crate::error::Result;
use crate::platform::{GitHubService, HostConnector, RepositoryHost};
use crate::types::RepoId;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Connects to repositories on GitHub (or GitHub Enterprise)
#[derive(Clone)]
pub struct GitHubConnector {
    token: String,
    api_url: Option<String>,
}

impl GitHubConnector {
    /// Connector using `token`, against `api_url` or api.github.com
    pub fn new(token: impl Into<String>, api_url: Option<String>) -> Self {
        Self {
            token: token.into(),
            api_url,
        }
    }
}

impl std::fmt::Debug for GitHubConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConnector")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HostConnector for GitHubConnector {
    async fn connect(&self, repo: &RepoId) -> Result<Arc<dyn RepositoryHost>> {
        debug!(repo = %repo, api_url = ?self.api_url, "connecting to GitHub");
        let service = GitHubService::new(&self.token, repo.clone(), self.api_url.as_deref())?;
        Ok(Arc::new(service))
    }
}
