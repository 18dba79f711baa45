//! Core types for files-sync

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// A repository on the host, optionally pinned to a base branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Base branch override (`owner/name@branch`); `None` means the default branch
    pub base: Option<String>,
}

impl RepoId {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Git file mode of a synced file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    /// `100644`
    Regular,
    /// `100755`
    Executable,
}

impl FileMode {
    /// Mode string as used in git trees
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
        }
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source file resolved to its destination path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Source path, relative to the working directory
    pub from: PathBuf,
    /// Destination path, `/`-separated, relative to the repository root
    pub to: String,
    /// File mode derived from local permissions
    pub mode: FileMode,
    /// Final content (after template rendering)
    pub content: Vec<u8>,
}

/// A blob entry in a destination tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Raw git mode (`100644`, `100755`, `120000`, ...)
    pub mode: String,
}

/// Content of one entry in a tree mutation batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeContent {
    /// Write these bytes at the path
    Inline(Vec<u8>),
    /// Remove the path (tombstone)
    Deleted,
}

/// One entry of a tree mutation batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    /// Path relative to the repository root
    pub path: String,
    /// Git mode string
    pub mode: String,
    /// New content or tombstone
    pub content: TreeContent,
}

/// How a file differs between two commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// New file
    Added,
    /// Content or mode changed
    Modified,
    /// File removed
    Removed,
    /// Moved to a new path
    Renamed,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

/// One file in a commit comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Path relative to the repository root
    pub path: String,
    /// Kind of change
    pub status: ChangeStatus,
}

/// A pull request on a destination repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub html_url: String,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// Base commit SHA
    pub base_sha: String,
    /// Head commit SHA
    pub head_sha: String,
    /// PR title
    pub title: String,
    /// GraphQL node ID (used for auto-merge mutations)
    pub node_id: Option<String>,
    /// Whether PR is a draft
    pub is_draft: bool,
}

/// Rendered title and body for a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestContent {
    /// PR title
    pub title: String,
    /// PR body
    pub body: String,
}

/// A pull request in the source repository that introduced a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedPullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL for the PR
    pub html_url: String,
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

impl FromStr for PrState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "MERGED" => Ok(Self::Merged),
            other => Err(Error::MergeState(format!("unknown PR state '{other}'"))),
        }
    }
}

/// Host-reported mergeability classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStateStatus {
    /// Head ref is out of date
    Behind,
    /// Blocked by branch protection (reviews, required checks)
    Blocked,
    /// Mergeable with passing checks
    Clean,
    /// Merge conflicts
    Dirty,
    /// PR is a draft
    Draft,
    /// Mergeable with passing checks and pre-receive hooks
    HasHooks,
    /// Not yet computed
    Unknown,
    /// Mergeable with non-passing checks
    Unstable,
}

impl MergeStateStatus {
    /// Whether the host reports no blocking condition
    pub const fn is_unblocked(self) -> bool {
        matches!(self, Self::Clean | Self::HasHooks | Self::Unstable)
    }
}

impl FromStr for MergeStateStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BEHIND" => Ok(Self::Behind),
            "BLOCKED" => Ok(Self::Blocked),
            "CLEAN" => Ok(Self::Clean),
            "DIRTY" => Ok(Self::Dirty),
            "DRAFT" => Ok(Self::Draft),
            "HAS_HOOKS" => Ok(Self::HasHooks),
            "UNKNOWN" => Ok(Self::Unknown),
            "UNSTABLE" => Ok(Self::Unstable),
            other => Err(Error::MergeState(format!(
                "unknown merge state status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for MergeStateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Behind => "BEHIND",
            Self::Blocked => "BLOCKED",
            Self::Clean => "CLEAN",
            Self::Dirty => "DIRTY",
            Self::Draft => "DRAFT",
            Self::HasHooks => "HAS_HOOKS",
            Self::Unknown => "UNKNOWN",
            Self::Unstable => "UNSTABLE",
        };
        f.write_str(s)
    }
}

/// Standing auto-merge request on a PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoMergeRequest {
    /// Merge method the request was enabled with
    pub merge_method: Option<MergeMethod>,
    /// When auto-merge was enabled
    pub enabled_at: Option<DateTime<Utc>>,
}

/// Live mergeability signals for a PR
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MergeSignals {
    /// GraphQL node ID
    pub node_id: String,
    /// Current state of the PR
    pub state: PrState,
    /// Whether the PR was merged
    pub merged: bool,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Whether the PR sits in the merge queue
    pub is_in_merge_queue: bool,
    /// Whether the base branch requires the merge queue
    pub is_merge_queue_enabled: bool,
    /// Host mergeability classification
    pub merge_state_status: MergeStateStatus,
    /// Existing auto-merge request, if any
    pub auto_merge_request: Option<AutoMergeRequest>,
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits into one
    Squash,
    /// Rebase commits onto base branch
    Rebase,
}

impl MergeMethod {
    /// GraphQL enum value (`PullRequestMergeMethod`)
    pub const fn graphql_name(self) -> &'static str {
        match self {
            Self::Merge => "MERGE",
            Self::Squash => "SQUASH",
            Self::Rebase => "REBASE",
        }
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

impl FromStr for MergeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MERGE" => Ok(Self::Merge),
            "SQUASH" => Ok(Self::Squash),
            "REBASE" => Ok(Self::Rebase),
            other => Err(Error::MergeState(format!("unknown merge method '{other}'"))),
        }
    }
}

/// Requested merge policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Never merge
    #[default]
    Disabled,
    /// Merge when the host allows it
    Manual,
    /// Enable auto-merge (or enqueue)
    Auto,
    /// Merge right away
    Immediate,
    /// Merge right away, bypassing branch protection
    Admin,
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::Manual => "manual",
            Self::Auto => "auto",
            Self::Immediate => "immediate",
            Self::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// Commit message used when merging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeCommitMessage {
    /// Commit headline (`None` lets the host decide)
    pub headline: Option<String>,
    /// Commit body (`None` lets the host decide)
    pub body: Option<String>,
}

/// Host response to a merge call
#[derive(Debug, Clone)]
pub struct MergeResponse {
    /// Whether the merge happened
    pub merged: bool,
    /// The SHA of the merge commit
    pub sha: Option<String>,
    /// Message from the host (especially on failure)
    pub message: Option<String>,
}

/// Outcome of the merge state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// The PR cannot be merged in its current state
    Unmergeable,
    /// Nothing to do: queued, merged, or auto-merge already set up
    AlreadyHandled,
    /// Auto-merge enabled
    Prepared,
    /// Merged right away
    Merged,
}

impl std::fmt::Display for MergeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unmergeable => "unmergeable",
            Self::AlreadyHandled => "already handled",
            Self::Prepared => "auto-merge enabled",
            Self::Merged => "merged",
        };
        f.write_str(s)
    }
}
