//! Progress reporting for sync runs

use crate::engine::DestinationOutcome;
use crate::types::RepoId;
use async_trait::async_trait;

/// Receives operator-facing progress while a run executes
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A pattern is starting
    async fn on_pattern(&self, index: usize, total: usize, destinations: usize);

    /// A destination is starting
    async fn on_destination(&self, repo: &RepoId, branch: &str);

    /// A remote operation is starting; paired with [`on_remote_done`](Self::on_remote_done)
    async fn on_remote_start(&self, _message: &str) {}

    /// The current remote operation finished
    async fn on_remote_done(&self) {}

    /// Informational line
    async fn on_message(&self, message: &str);

    /// Non-fatal problem
    async fn on_warning(&self, message: &str);

    /// A destination finished
    async fn on_outcome(&self, repo: &RepoId, outcome: &DestinationOutcome);
}

/// Progress sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_pattern(&self, _index: usize, _total: usize, _destinations: usize) {}
    async fn on_destination(&self, _repo: &RepoId, _branch: &str) {}
    async fn on_message(&self, _message: &str) {}
    async fn on_warning(&self, _message: &str) {}
    async fn on_outcome(&self, _repo: &RepoId, _outcome: &DestinationOutcome) {}
}
