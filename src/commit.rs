//! Commit application
//!
//! One destination gets at most one commit per run: a tree derived from the
//! parent's tree, a commit with that single parent, then one ref write. The
//! ref write is always last, so a failure anywhere earlier leaves the branch
//! where it was.

use crate::changeset::ChangeSet;
use crate::config::{BranchSettings, CommitSettings};
use crate::error::{Error, Result};
use crate::platform::RepositoryHost;
use crate::template;
use crate::types::{PullRequest, RepoId};
use serde_json::{Value, json};
use tracing::{debug, info};

/// How the candidate branch ref gets written after the commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdate {
    /// Branch does not exist yet
    Create,
    /// Branch exists and the commit builds on its tip
    FastForward,
    /// Branch exists but the commit builds on the base tip
    Force,
}

/// Candidate branch state before committing
#[derive(Debug, Clone)]
pub struct AcquiredBranch {
    /// Candidate branch name
    pub name: String,
    /// Base branch the sync targets
    pub base: String,
    /// Commit the new commit will build on
    pub parent_sha: String,
    /// Open PR on the candidate branch, if any
    pub existing_pr: Option<PullRequest>,
    /// How the ref moves once the commit exists
    pub ref_update: RefUpdate,
}

/// Result of applying a change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Empty change set, nothing written
    NoChanges,
    /// Branch now points at `sha`
    Committed {
        /// New commit
        sha: String,
        /// Its only parent
        parent_sha: String,
    },
}

/// Deterministic candidate branch name for a destination and pattern
pub fn candidate_branch_name(settings: &BranchSettings, repo: &RepoId, index: usize) -> Result<String> {
    let context = json!({
        "prefix": settings.prefix,
        "repository": repo.full_name(),
        "index": index,
    });
    let name = template::render(&settings.format, &context)?;
    let name = name.trim().trim_matches('/').to_string();

    if name.is_empty() || name.contains("..") || name.contains(char::is_whitespace) {
        return Err(Error::Config(format!("invalid branch name '{name}'")));
    }
    Ok(name)
}

/// Render the commit message
pub fn commit_message(settings: &CommitSettings, context: &Value) -> Result<String> {
    let subject = template::render(&settings.subject, context)?;
    let body = template::render(&settings.body, context)?;

    let mut layout = match context {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    layout.insert("subject".to_string(), Value::String(subject.trim().to_string()));
    layout.insert("body".to_string(), Value::String(body.trim().to_string()));

    let message = template::render(&settings.format, &Value::Object(layout))?;
    Ok(message.trim_end().to_string())
}

/// Look up the candidate branch and decide what the commit builds on
///
/// - open PR on the branch: its head, or the tip of its base with `force`
/// - no PR: the base tip; a leftover branch of the same name is overwritten
pub async fn acquire_branch(
    host: &dyn RepositoryHost,
    name: &str,
    force: bool,
) -> Result<AcquiredBranch> {
    let existing_pr = host.find_open_pr(name).await?;

    if let Some(pr) = existing_pr {
        let (parent_sha, ref_update) = if force {
            (base_tip(host, &pr.base_ref).await?, RefUpdate::Force)
        } else {
            (pr.head_sha.clone(), RefUpdate::FastForward)
        };
        debug!(branch = name, pr_number = pr.number, %parent_sha, ?ref_update, "reusing PR branch");
        return Ok(AcquiredBranch {
            name: name.to_string(),
            base: pr.base_ref.clone(),
            parent_sha,
            existing_pr: Some(pr),
            ref_update,
        });
    }

    let base = match &host.repo().base {
        Some(base) => base.clone(),
        None => host.default_branch().await?,
    };
    let parent_sha = base_tip(host, &base).await?;
    let ref_update = if host.branch_sha(name).await?.is_some() {
        RefUpdate::Force
    } else {
        RefUpdate::Create
    };

    debug!(branch = name, %base, %parent_sha, ?ref_update, "branching from base");
    Ok(AcquiredBranch {
        name: name.to_string(),
        base,
        parent_sha,
        existing_pr: None,
        ref_update,
    })
}

async fn base_tip(host: &dyn RepositoryHost, base: &str) -> Result<String> {
    host.branch_sha(base)
        .await?
        .ok_or_else(|| Error::remote("branch_sha", format!("base branch '{base}' not found")))
}

/// Write the change set as one commit on the candidate branch
pub async fn apply_change_set(
    host: &dyn RepositoryHost,
    branch: &AcquiredBranch,
    changes: &ChangeSet,
    message: &str,
) -> Result<CommitOutcome> {
    if changes.is_empty() {
        debug!(branch = %branch.name, "empty change set, not committing");
        return Ok(CommitOutcome::NoChanges);
    }

    let tree_sha = host
        .create_tree(&branch.parent_sha, &changes.tree_changes())
        .await?;
    let sha = host
        .create_commit(message, &tree_sha, &branch.parent_sha)
        .await?;

    match branch.ref_update {
        RefUpdate::Create => host.create_branch(&branch.name, &sha).await?,
        RefUpdate::FastForward => host.update_branch(&branch.name, &sha, false).await?,
        RefUpdate::Force => host.update_branch(&branch.name, &sha, true).await?,
    }

    info!(
        branch = %branch.name,
        %sha,
        upserts = changes.upserts.len(),
        deletions = changes.deletions.len(),
        "committed"
    );
    Ok(CommitOutcome::Committed {
        sha,
        parent_sha: branch.parent_sha.clone(),
    })
}
