//! Shared command context for CLI commands

use crate::cli::SyncArgs;
use files_sync::auth::get_github_auth;
use files_sync::config::{Config, Pattern};
use files_sync::engine::{Engine, RunContext};
use files_sync::error::Result;
use files_sync::platform::GitHubConnector;
use files_sync::scope::LocalFs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Validated config, ready to run
pub struct LoadedConfig {
    /// Where the config was read from
    pub path: PathBuf,
    /// Validated patterns, in declaration order
    pub patterns: Vec<Pattern>,
}

impl LoadedConfig {
    /// Load and validate the config named by `args`
    pub fn load(args: &SyncArgs) -> Result<Self> {
        let path = args.config_path();
        let patterns = Config::load(&path)?.patterns()?;
        debug!(path = %path.display(), patterns = patterns.len(), "config loaded");
        Ok(Self { path, patterns })
    }
}

/// Everything a sync run needs
pub struct CommandContext {
    /// Validated config
    pub config: LoadedConfig,
    /// Engine wired to GitHub and the working directory
    pub engine: Engine,
}

impl CommandContext {
    /// Load config, resolve credentials and wire up the engine
    ///
    /// Config errors surface before any credential lookup.
    pub async fn new(args: &SyncArgs) -> Result<Self> {
        let config = LoadedConfig::load(args)?;

        let auth = get_github_auth(args.github_token.as_deref()).await?;
        let connector = GitHubConnector::new(auth.token, args.github_api_url.clone());
        let fs = LocalFs::new(&args.workdir);

        let engine = Engine::new(Arc::new(connector), Arc::new(fs), run_context(args));
        Ok(Self { config, engine })
    }
}

/// Run metadata from flags and the Actions environment
pub fn run_context(args: &SyncArgs) -> RunContext {
    RunContext {
        source_repository: args.source_repository.clone(),
        source_sha: args.source_sha.clone(),
        server_url: args.server_url.trim_end_matches('/').to_string(),
        workflow: args.workflow.clone(),
        run_id: args.run_id.clone(),
        run_number: args.run_number.clone(),
    }
}
