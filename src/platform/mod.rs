//! Repository host access
//!
//! Everything the engine does to a destination repository goes through
//! [`RepositoryHost`]: git data (refs, trees, commits), pull requests and
//! merge controls. [`HostConnector`] builds one host per repository.

mod detection;
mod factory;
mod github;

pub use detection::parse_repo_id;
pub use factory::GitHubConnector;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{
    ChangedFile, LinkedPullRequest, MergeCommitMessage, MergeMethod, MergeResponse, MergeSignals,
    PullRequest, PullRequestContent, RepoId, TreeChange, TreeEntry,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations against one repository on the host
///
/// Branch names are short names (`main`, not `refs/heads/main`).
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// The repository this host talks to
    fn repo(&self) -> &RepoId;

    /// Name of the repository's default branch
    async fn default_branch(&self) -> Result<String>;

    /// Tip SHA of a branch, `None` if the branch does not exist
    async fn branch_sha(&self, branch: &str) -> Result<Option<String>>;

    /// Create a branch pointing at `sha`
    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()>;

    /// Move an existing branch to `sha`
    ///
    /// Without `force` the host rejects anything but a fast-forward.
    async fn update_branch(&self, branch: &str, sha: &str, force: bool) -> Result<()>;

    /// Delete a branch; deleting a missing branch succeeds
    async fn delete_branch(&self, branch: &str) -> Result<()>;

    /// Blob entries of the commit's tree at or under any of `prefixes`
    ///
    /// An empty prefix matches the whole tree; no prefixes match nothing.
    async fn list_tree(&self, commit_sha: &str, prefixes: &[String]) -> Result<Vec<TreeEntry>>;

    /// Create a tree from the parent commit's tree with `changes` applied
    async fn create_tree(&self, parent_sha: &str, changes: &[TreeChange]) -> Result<String>;

    /// Create a commit with exactly one parent
    async fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str)
    -> Result<String>;

    /// Files that differ between two commits
    async fn compare(&self, base_sha: &str, head_sha: &str) -> Result<Vec<ChangedFile>>;

    /// The open PR whose head is exactly `head_branch`
    async fn find_open_pr(&self, head_branch: &str) -> Result<Option<PullRequest>>;

    /// Open a PR
    async fn create_pr(
        &self,
        head: &str,
        base: &str,
        content: &PullRequestContent,
    ) -> Result<PullRequest>;

    /// Replace a PR's title and body
    async fn update_pr(&self, number: u64, content: &PullRequestContent) -> Result<PullRequest>;

    /// Close a PR without merging
    async fn close_pr(&self, number: u64) -> Result<()>;

    /// Add labels to a PR
    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    /// Request reviews from users and teams
    async fn request_reviewers(
        &self,
        number: u64,
        reviewers: &[String],
        team_reviewers: &[String],
    ) -> Result<()>;

    /// Assign users to a PR
    async fn add_assignees(&self, number: u64, assignees: &[String]) -> Result<()>;

    /// Live mergeability signals
    async fn merge_signals(&self, number: u64) -> Result<MergeSignals>;

    /// Turn on auto-merge (or enqueue, when the base uses a merge queue)
    async fn enable_auto_merge(
        &self,
        node_id: &str,
        method: MergeMethod,
        message: &MergeCommitMessage,
    ) -> Result<()>;

    /// Cancel a standing auto-merge request
    async fn disable_auto_merge(&self, node_id: &str) -> Result<()>;

    /// Merge a PR now
    async fn merge_pr(
        &self,
        number: u64,
        method: MergeMethod,
        message: &MergeCommitMessage,
    ) -> Result<MergeResponse>;

    /// PRs that contain a commit
    async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<LinkedPullRequest>>;
}

/// Builds a [`RepositoryHost`] for a repository
#[async_trait]
pub trait HostConnector: Send + Sync {
    /// Connect to `repo`
    async fn connect(&self, repo: &RepoId) -> Result<Arc<dyn RepositoryHost>>;
}
