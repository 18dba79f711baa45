//! Validate command - check the config without touching any repository

use crate::cli::SyncArgs;
use crate::cli::context::LoadedConfig;
use crate::cli::style::{Stylize, arrow, check};
use anstream::println;
use files_sync::config::Pattern;
use files_sync::error::Result;

/// Load the config and print what each pattern would do
pub fn run_validate(args: &SyncArgs) -> Result<()> {
    let config = LoadedConfig::load(args)?;

    for pattern in &config.patterns {
        print_pattern(pattern);
    }

    println!();
    println!(
        "{} {} is valid ({} pattern(s))",
        check(),
        config.path.display().accent(),
        config.patterns.len()
    );
    Ok(())
}

fn print_pattern(pattern: &Pattern) {
    println!("{}", format!("Pattern {}", pattern.index).emphasis());

    for spec in &pattern.files {
        let excludes = if spec.exclude.is_empty() {
            String::new()
        } else {
            format!(" (exclude: {})", spec.exclude.join(", "))
        };
        println!(
            "  {} {} {} {}{}",
            arrow(),
            spec.from.display(),
            "→".muted(),
            spec.to,
            excludes.muted()
        );
    }

    let merge = pattern.settings.pull_request.merge.mode;
    for repo in &pattern.repositories {
        println!(
            "  {} {} {}",
            "•".muted(),
            repo.full_name().accent(),
            format!("merge: {merge}").muted()
        );
    }
}
