//! Command-line interface

pub mod context;
pub mod run;
pub mod style;
pub mod validate;

use anstream::{eprintln, println};
use async_trait::async_trait;
use clap::{ArgAction, Args, Parser, Subcommand};
use files_sync::config::DEFAULT_CONFIG_PATH;
use files_sync::engine::{DEFAULT_SERVER_URL, DestinationOutcome, ProgressCallback};
use files_sync::types::RepoId;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use style::{Stylize, WARN, arrow, check, spinner_style};

/// Keep files in sync across GitHub repositories
#[derive(Debug, Parser)]
#[command(name = "files-sync", author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand; syncs when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub args: SyncArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    /// Log filter when `RUST_LOG` is unset
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "files_sync=debug,info",
            _ => "trace",
        }
    }
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load and check the config file without touching any repository
    Validate,
}

/// Options for a sync run
#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// GitHub token (falls back to `gh auth token`)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Config file, relative to the working directory
    #[arg(long, env = "FILES_SYNC_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config_file: PathBuf,

    /// Directory source paths are resolved against
    #[arg(long, default_value = ".", global = true)]
    pub workdir: PathBuf,

    /// Source repository (`owner/name`)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub source_repository: Option<String>,

    /// Source commit SHA
    #[arg(long, env = "GITHUB_SHA")]
    pub source_sha: Option<String>,

    /// Web URL of the GitHub server
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Workflow name
    #[arg(long, env = "GITHUB_WORKFLOW")]
    pub workflow: Option<String>,

    /// Workflow run id
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: Option<String>,

    /// Workflow run number
    #[arg(long, env = "GITHUB_RUN_NUMBER")]
    pub run_number: Option<String>,

    /// GitHub API URL (GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL")]
    pub github_api_url: Option<String>,
}

impl SyncArgs {
    /// Config path, resolved against the working directory
    pub fn config_path(&self) -> PathBuf {
        if self.config_file.is_absolute() {
            self.config_file.clone()
        } else {
            self.workdir.join(&self.config_file)
        }
    }
}

/// Progress output for the terminal
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// One line per event, spinner during remote waits
    pub const fn compact() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(spinner) = guard.take()
        {
            spinner.finish_and_clear();
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_pattern(&self, index: usize, total: usize, destinations: usize) {
        println!();
        println!(
            "{} {}",
            format!("Pattern {index}/{total}").emphasis(),
            format!("({destinations} destination(s))").muted()
        );
    }

    async fn on_destination(&self, repo: &RepoId, branch: &str) {
        println!("  {} {} {}", arrow(), repo.full_name().accent(), branch.muted());
    }

    async fn on_remote_start(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("{message}..."));
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(previous) = guard.replace(spinner)
        {
            previous.finish_and_clear();
        }
    }

    async fn on_remote_done(&self) {
        self.clear_spinner();
    }

    async fn on_message(&self, message: &str) {
        self.clear_spinner();
        println!("    {}", message.muted());
    }

    async fn on_warning(&self, message: &str) {
        self.clear_spinner();
        eprintln!("    {} {}", WARN.warn(), message.warn());
    }

    async fn on_outcome(&self, _repo: &RepoId, outcome: &DestinationOutcome) {
        self.clear_spinner();
        let line = match outcome {
            DestinationOutcome::Retired { closed_pr: Some(n) } => {
                format!("in sync, closed PR #{n}")
            }
            DestinationOutcome::Retired { closed_pr: None } => "in sync".to_string(),
            DestinationOutcome::Committed { sha } => format!("committed {sha}"),
            DestinationOutcome::PullRequest { pr, action, merge } => {
                let merge = merge.map(|m| format!(", {m}")).unwrap_or_default();
                format!("PR #{} {action}{merge}", pr.number)
            }
        };
        println!("    {} {}", check(), line.success());
    }
}
