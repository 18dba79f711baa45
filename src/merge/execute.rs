//! Merge execution - effectful operations
//!
//! Takes a `MergePlan` and performs it through the host.

use crate::config::MergeSettings;
use crate::engine::ProgressCallback;
use crate::error::{Error, Result};
use crate::merge::plan::{MergeAction, MergePlan};
use crate::platform::RepositoryHost;
use crate::types::{MergeCommitMessage, MergeResult};
use tracing::{info, warn};

/// The pull request a merge plan is carried out on
#[derive(Debug, Clone, Copy)]
pub struct MergeTarget<'a> {
    /// PR number
    pub pr_number: u64,
    /// GraphQL node id, for auto-merge mutations
    pub node_id: &'a str,
    /// Head branch, deleted after a merge when configured
    pub branch: &'a str,
    /// Strategy and branch cleanup
    pub settings: &'a MergeSettings,
    /// Merge commit message
    pub message: &'a MergeCommitMessage,
}

/// Execute the merge plan (EFFECTFUL)
///
/// A host merge response that reports `merged: false` is an error. Deleting
/// the branch after a merge is best-effort: failure is reported, the result
/// stays `Merged`.
pub async fn execute_merge(
    plan: &MergePlan,
    target: &MergeTarget<'_>,
    host: &dyn RepositoryHost,
    progress: &dyn ProgressCallback,
) -> Result<MergeResult> {
    let MergeTarget {
        pr_number,
        node_id,
        branch,
        settings,
        message,
    } = *target;

    if plan.disable_auto_merge {
        progress
            .on_message(&format!("Disabling existing auto-merge on PR #{pr_number}"))
            .await;
        host.disable_auto_merge(node_id).await?;
    }

    let result = match &plan.action {
        MergeAction::AlreadyHandled => {
            progress
                .on_message(&format!("PR #{pr_number}: merge already handled"))
                .await;
            MergeResult::AlreadyHandled
        }
        MergeAction::Unmergeable(reasons) => {
            progress
                .on_warning(&format!(
                    "PR #{pr_number} cannot be merged: {}",
                    reasons.join(", ")
                ))
                .await;
            MergeResult::Unmergeable
        }
        MergeAction::EnableAutoMerge => {
            host.enable_auto_merge(node_id, settings.strategy, message)
                .await?;
            progress
                .on_message(&format!(
                    "Enabled auto-merge ({}) on PR #{pr_number}",
                    settings.strategy
                ))
                .await;
            MergeResult::Prepared
        }
        MergeAction::MergeNow => {
            progress
                .on_message(&format!("Merging PR #{pr_number} ({})", settings.strategy))
                .await;
            let response = host.merge_pr(pr_number, settings.strategy, message).await?;
            if !response.merged {
                return Err(Error::remote(
                    "merge_pr",
                    response
                        .message
                        .unwrap_or_else(|| format!("PR #{pr_number} was not merged")),
                ));
            }
            let sha = response.sha.as_deref().unwrap_or("(no sha)");
            progress.on_message(&format!("Merged: {sha}")).await;
            MergeResult::Merged
        }
    };

    if result == MergeResult::Merged && settings.delete_branch {
        match host.delete_branch(branch).await {
            Ok(()) => progress.on_message(&format!("Deleted branch {branch}")).await,
            Err(e) => {
                warn!(branch, error = %e, "failed to delete merged branch");
                progress
                    .on_warning(&format!("Failed to delete branch {branch}: {e}"))
                    .await;
            }
        }
    }

    info!(pr_number, mode = %plan.effective, %result, "merge step finished");
    Ok(result)
}
