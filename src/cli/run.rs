//! Sync command - push configured files to every destination

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use crate::cli::{CliProgress, SyncArgs};
use anstream::println;
use files_sync::engine::{GITHUB_OUTPUT_ENV, RunOutput, write_github_output};
use files_sync::error::Result;
use std::path::PathBuf;
use tracing::debug;

/// Run the sync command
pub async fn run_sync(args: &SyncArgs) -> Result<()> {
    let ctx = CommandContext::new(args).await?;

    println!(
        "{} {}",
        "Syncing from".emphasis(),
        ctx.config.path.display().accent()
    );

    let progress = CliProgress::compact();
    let output = ctx.engine.run(&ctx.config.patterns, &progress).await?;

    print_summary(&output);

    if let Some(path) = std::env::var_os(GITHUB_OUTPUT_ENV).map(PathBuf::from) {
        debug!(path = %path.display(), "writing step outputs");
        write_github_output(&path, &output)?;
    }

    Ok(())
}

fn print_summary(output: &RunOutput) {
    println!();
    if output.pull_request_urls.is_empty() && output.synced_files.is_empty() {
        println!("{} {}", check(), "Everything in sync".success());
        return;
    }

    println!(
        "{} {} file(s) synced, {} pull request(s)",
        check(),
        output.synced_files.len(),
        output.pull_request_urls.len()
    );
    for url in &output.pull_request_urls {
        println!("  {}", url.accent());
    }
}
