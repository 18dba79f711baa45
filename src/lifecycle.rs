//! Pull request lifecycle
//!
//! After a commit lands, a destination's PR is either retired (nothing left
//! to propose) or created/updated in place, then decorated with labels,
//! reviewers and assignees.

use crate::commit::AcquiredBranch;
use crate::config::PullRequestSettings;
use crate::engine::ProgressCallback;
use crate::error::Result;
use crate::platform::RepositoryHost;
use crate::types::{PullRequest, PullRequestContent};
use tracing::info;

/// What happened to the destination PR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrAction {
    /// A new PR was opened
    Created,
    /// The existing PR got a new head and fresh title/body
    UpdatedInPlace,
}

impl std::fmt::Display for PrAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::UpdatedInPlace => write!(f, "updated"),
        }
    }
}

/// Close the open PR (if any) and delete the candidate branch
///
/// Returns the closed PR's number.
pub async fn retire(
    host: &dyn RepositoryHost,
    branch: &AcquiredBranch,
    progress: &dyn ProgressCallback,
) -> Result<Option<u64>> {
    let closed = match &branch.existing_pr {
        Some(pr) => {
            host.close_pr(pr.number).await?;
            progress
                .on_message(&format!("Closed PR #{}: no changes left to sync", pr.number))
                .await;
            Some(pr.number)
        }
        None => None,
    };

    host.delete_branch(&branch.name).await?;
    info!(branch = %branch.name, closed_pr = ?closed, "retired sync branch");
    Ok(closed)
}

/// Open a PR for the branch or refresh the existing one
pub async fn upsert_pull_request(
    host: &dyn RepositoryHost,
    branch: &AcquiredBranch,
    content: &PullRequestContent,
) -> Result<(PullRequest, PrAction)> {
    if let Some(existing) = &branch.existing_pr {
        let pr = host.update_pr(existing.number, content).await?;
        info!(pr_number = pr.number, "updated PR in place");
        return Ok((pr, PrAction::UpdatedInPlace));
    }

    let pr = host.create_pr(&branch.name, &branch.base, content).await?;
    info!(pr_number = pr.number, url = %pr.html_url, "created PR");
    Ok((pr, PrAction::Created))
}

/// Apply labels, reviewers and assignees that are configured
pub async fn apply_metadata(
    host: &dyn RepositoryHost,
    pr_number: u64,
    settings: &PullRequestSettings,
    progress: &dyn ProgressCallback,
) -> Result<()> {
    if settings.labels.is_empty() {
        progress.on_message("Labels: none configured").await;
    } else {
        host.add_labels(pr_number, &settings.labels).await?;
        progress
            .on_message(&format!("Labels: {}", settings.labels.join(", ")))
            .await;
    }

    if settings.reviewers.is_empty() && settings.team_reviewers.is_empty() {
        progress.on_message("Reviewers: none configured").await;
    } else {
        host.request_reviewers(pr_number, &settings.reviewers, &settings.team_reviewers)
            .await?;
        let all: Vec<String> = settings
            .reviewers
            .iter()
            .cloned()
            .chain(settings.team_reviewers.iter().map(|t| format!("team:{t}")))
            .collect();
        progress
            .on_message(&format!("Reviewers: {}", all.join(", ")))
            .await;
    }

    if settings.assignees.is_empty() {
        progress.on_message("Assignees: none configured").await;
    } else {
        host.add_assignees(pr_number, &settings.assignees).await?;
        progress
            .on_message(&format!("Assignees: {}", settings.assignees.join(", ")))
            .await;
    }

    Ok(())
}
