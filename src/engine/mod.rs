//! Sync engine
//!
//! Drives every pattern through its destinations in declaration order:
//! resolve → change set → commit → PR lifecycle → merge. The first error
//! anywhere ends the run.

mod context;
mod outputs;
mod progress;

pub use context::{ChangeDescriptor, DEFAULT_SERVER_URL, OriginPullRequest, RunContext};
pub use outputs::{GITHUB_OUTPUT_ENV, RunOutput, write_github_output};
pub use progress::{NoopProgress, ProgressCallback};

use context::{describe_changes, with_changes};

use crate::changeset::build_change_set;
use crate::commit::{
    AcquiredBranch, CommitOutcome, acquire_branch, apply_change_set, candidate_branch_name,
    commit_message,
};
use crate::config::Pattern;
use crate::error::{Result, ResultExt};
use crate::lifecycle::{PrAction, apply_metadata, retire, upsert_pull_request};
use crate::merge::{MergeTarget, execute_merge, plan_merge};
use crate::platform::{HostConnector, RepositoryHost, parse_repo_id};
use crate::scope::{Resolution, ScopeResolver, SourceFs};
use crate::template;
use crate::types::{
    LinkedPullRequest, MergeCommitMessage, MergeMode, MergeResult, PullRequest,
    PullRequestContent, RepoId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a destination ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationOutcome {
    /// Nothing to propose: open PR closed (if any), branch deleted
    Retired {
        /// Number of the closed PR
        closed_pr: Option<u64>,
    },
    /// Committed to the branch, PRs disabled
    Committed {
        /// New branch head
        sha: String,
    },
    /// PR created or updated
    PullRequest {
        /// The PR
        pr: PullRequest,
        /// Created or updated
        action: PrAction,
        /// Merge outcome, `None` when merging is disabled
        merge: Option<MergeResult>,
    },
}

/// Runs patterns against their destinations
pub struct Engine {
    connector: Arc<dyn HostConnector>,
    resolver: ScopeResolver,
    run: RunContext,
}

impl Engine {
    /// Engine reading sources from `fs` and reaching hosts through `connector`
    pub fn new(connector: Arc<dyn HostConnector>, fs: Arc<dyn SourceFs>, run: RunContext) -> Self {
        Self {
            connector,
            resolver: ScopeResolver::new(fs),
            run,
        }
    }

    /// Sync every pattern, stopping at the first error
    pub async fn run(
        &self,
        patterns: &[Pattern],
        progress: &dyn ProgressCallback,
    ) -> Result<RunOutput> {
        let origin = self.originating_pr(progress).await;
        let mut output = RunOutput::default();

        for pattern in patterns {
            progress
                .on_pattern(pattern.index, patterns.len(), pattern.repositories.len())
                .await;
            let pattern_output = self
                .sync_pattern(pattern, origin.as_ref(), progress)
                .await
                .with_context(|| format!("pattern {}", pattern.index))?;
            output.merge(pattern_output);
        }

        info!(
            pull_requests = output.pull_request_urls.len(),
            files = output.synced_files.len(),
            "run complete"
        );
        Ok(output)
    }

    /// Source PR that introduced the commit being synced
    ///
    /// Best-effort: a failed lookup only drops the link from PR bodies.
    async fn originating_pr(&self, progress: &dyn ProgressCallback) -> Option<LinkedPullRequest> {
        let (Some(repository), Some(sha)) = (&self.run.source_repository, &self.run.source_sha)
        else {
            return None;
        };

        match self.lookup_origin(repository, sha).await {
            Ok(origin) => {
                debug!(origin = ?origin.as_ref().map(|p| p.number), "originating PR lookup");
                origin
            }
            Err(e) => {
                warn!(error = %e, "could not look up originating pull request");
                progress
                    .on_warning(&format!("Could not look up originating pull request: {e}"))
                    .await;
                None
            }
        }
    }

    async fn lookup_origin(&self, repository: &str, sha: &str) -> Result<Option<LinkedPullRequest>> {
        let repo = parse_repo_id(repository)?;
        let host = self.connector.connect(&repo).await?;
        Ok(host.pull_requests_for_commit(sha).await?.into_iter().next())
    }

    async fn sync_pattern(
        &self,
        pattern: &Pattern,
        origin: Option<&LinkedPullRequest>,
        progress: &dyn ProgressCallback,
    ) -> Result<RunOutput> {
        let file_context = pattern
            .template
            .as_ref()
            .map(|vars| self.run.file_context(vars));
        let resolution = self
            .resolver
            .resolve(&pattern.files, file_context.as_ref())
            .await?;

        info!(
            pattern = pattern.index,
            files = resolution.files.len(),
            destinations = pattern.repositories.len(),
            "resolved pattern"
        );

        let mut output = RunOutput::default();
        for repo in &pattern.repositories {
            let (outcome, destination_output) = self
                .sync_destination(pattern, repo, &resolution, origin, progress)
                .await
                .with_context(|| repo.full_name())?;
            progress.on_outcome(repo, &outcome).await;
            output.merge(destination_output);
        }
        Ok(output)
    }

    async fn sync_destination(
        &self,
        pattern: &Pattern,
        repo: &RepoId,
        resolution: &Resolution,
        origin: Option<&LinkedPullRequest>,
        progress: &dyn ProgressCallback,
    ) -> Result<(DestinationOutcome, RunOutput)> {
        let settings = &pattern.settings;
        let host = self.connector.connect(repo).await?;
        let host = host.as_ref();

        let branch_name = candidate_branch_name(&settings.branch, repo, pattern.index)?;
        progress.on_destination(repo, &branch_name).await;

        progress.on_remote_start("Preparing branch").await;
        let branch = acquire_branch(host, &branch_name, settings.pull_request.force).await;
        progress.on_remote_done().await;
        let branch = branch?;

        let tree = if resolution.scope.is_empty() {
            Vec::new()
        } else {
            host.list_tree(&branch.parent_sha, &resolution.scope.tree_prefixes())
                .await?
        };
        let changes = build_change_set(&resolution.scope, &resolution.files, &tree);
        debug!(
            upserts = changes.upserts.len(),
            deletions = changes.deletions.len(),
            "built change set"
        );

        let context = self.run.destination_context(pattern, repo);
        let message = commit_message(&settings.commit, &context)?;

        progress.on_remote_start("Committing").await;
        let committed = apply_change_set(host, &branch, &changes, &message).await;
        progress.on_remote_done().await;

        let (sha, parent_sha) = match committed? {
            CommitOutcome::NoChanges => return Self::retired(host, &branch, progress).await,
            CommitOutcome::Committed { sha, parent_sha } => (sha, parent_sha),
        };

        let diff = host.compare(&parent_sha, &sha).await?;
        if diff.is_empty() {
            debug!(branch = %branch.name, "commit changed nothing");
            return Self::retired(host, &branch, progress).await;
        }

        let mut output = RunOutput::default();
        output
            .synced_files
            .extend(diff.iter().map(|f| f.path.clone()));
        progress
            .on_message(&format!("Committed {} changed file(s)", diff.len()))
            .await;

        if settings.pull_request.disabled {
            return Ok((DestinationOutcome::Committed { sha }, output));
        }

        let sources: HashMap<String, String> = resolution
            .files
            .iter()
            .map(|f| (f.to.clone(), f.from.to_string_lossy().into_owned()))
            .collect();
        let descriptors = describe_changes(&diff, &sources, origin);
        let context = with_changes(&context, &descriptors);

        let content = PullRequestContent {
            title: template::render(&settings.pull_request.title, &context)?
                .trim()
                .to_string(),
            body: template::render(&settings.pull_request.body, &context)?,
        };
        let (pr, action) = upsert_pull_request(host, &branch, &content).await?;
        output.pull_request_urls.insert(pr.html_url.clone());
        progress
            .on_message(&format!("PR #{} {action}: {}", pr.number, pr.html_url))
            .await;

        apply_metadata(host, pr.number, &settings.pull_request, progress).await?;

        let merge = Self::merge(host, &pr, &branch, pattern, &context, progress).await?;

        Ok((DestinationOutcome::PullRequest { pr, action, merge }, output))
    }

    async fn retired(
        host: &dyn RepositoryHost,
        branch: &AcquiredBranch,
        progress: &dyn ProgressCallback,
    ) -> Result<(DestinationOutcome, RunOutput)> {
        let closed_pr = retire(host, branch, progress).await?;
        Ok((DestinationOutcome::Retired { closed_pr }, RunOutput::default()))
    }

    async fn merge(
        host: &dyn RepositoryHost,
        pr: &PullRequest,
        branch: &AcquiredBranch,
        pattern: &Pattern,
        context: &Value,
        progress: &dyn ProgressCallback,
    ) -> Result<Option<MergeResult>> {
        let settings = &pattern.settings.pull_request.merge;
        if settings.mode == MergeMode::Disabled {
            return Ok(None);
        }

        let signals = host.merge_signals(pr.number).await?;
        let Some(plan) = plan_merge(settings.mode, &signals) else {
            return Ok(None);
        };
        debug!(pr_number = pr.number, %plan, "merge plan");

        let render = |t: &Option<String>| -> Result<Option<String>> {
            t.as_deref().map(|t| template::render(t, context)).transpose()
        };
        let message = MergeCommitMessage {
            headline: render(&settings.commit_headline)?,
            body: render(&settings.commit_body)?,
        };

        progress.on_remote_start("Merging").await;
        let target = MergeTarget {
            pr_number: pr.number,
            node_id: &signals.node_id,
            branch: &branch.name,
            settings,
            message: &message,
        };
        let result = execute_merge(&plan, &target, host, progress).await;
        progress.on_remote_done().await;

        result.map(Some)
    }
}
