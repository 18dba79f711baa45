//! Run outputs and `$GITHUB_OUTPUT` persistence

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Environment variable naming the step output file
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Aggregated results of a run, deduplicated and sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    /// URLs of every created or updated PR
    pub pull_request_urls: BTreeSet<String>,
    /// Destination paths changed by any commit
    pub synced_files: BTreeSet<String>,
}

impl RunOutput {
    /// Fold another destination's output into this one
    pub fn merge(&mut self, other: Self) {
        self.pull_request_urls.extend(other.pull_request_urls);
        self.synced_files.extend(other.synced_files);
    }

    /// `name=json` lines as written to `$GITHUB_OUTPUT`
    pub fn to_output_lines(&self) -> Result<String> {
        let urls = serde_json::to_string(&self.pull_request_urls)
            .map_err(|e| Error::Internal(format!("failed to encode outputs: {e}")))?;
        let files = serde_json::to_string(&self.synced_files)
            .map_err(|e| Error::Internal(format!("failed to encode outputs: {e}")))?;
        Ok(format!("pull_request_urls={urls}\nsynced_files={files}\n"))
    }
}

/// Append the outputs to a step output file.
///
/// Creates the file if it doesn't exist.
pub fn write_github_output(path: &Path, output: &RunOutput) -> Result<()> {
    let lines = output.to_output_lines()?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))?;

    file.write_all(lines.as_bytes())?;
    Ok(())
}
