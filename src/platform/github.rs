//! GitHub repository host implementation
//!
//! Pull requests, issues and GraphQL go through octocrab. The git data
//! endpoints (refs, trees, commits, blobs, compare) go through a plain
//! reqwest client, since octocrab does not cover tree mutation.

use crate::error::{Error, Result};
use crate::platform::RepositoryHost;
use crate::scope::is_at_or_under;
use crate::types::{
    AutoMergeRequest, ChangeStatus, ChangedFile, LinkedPullRequest, MergeCommitMessage,
    MergeMethod, MergeResponse, MergeSignals, PullRequest, PullRequestContent, RepoId,
    TreeChange, TreeContent, TreeEntry,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

const DEFAULT_API_URL: &str = "https://api.github.com";

// GraphQL response types

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct MergeSignalsData {
    repository: Option<MergeSignalsRepository>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeSignalsRepository {
    pull_request: Option<GraphQlPullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPullRequest {
    id: String,
    state: String,
    is_draft: bool,
    merged: bool,
    merge_state_status: String,
    is_in_merge_queue: bool,
    is_merge_queue_enabled: bool,
    auto_merge_request: Option<GraphQlAutoMergeRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlAutoMergeRequest {
    enabled_at: Option<DateTime<Utc>>,
    merge_method: Option<String>,
}

impl TryFrom<GraphQlPullRequest> for MergeSignals {
    type Error = Error;

    fn try_from(pr: GraphQlPullRequest) -> Result<Self> {
        let auto_merge_request = pr
            .auto_merge_request
            .map(|req| -> Result<AutoMergeRequest> {
                Ok(AutoMergeRequest {
                    merge_method: req
                        .merge_method
                        .as_deref()
                        .map(str::parse::<MergeMethod>)
                        .transpose()?,
                    enabled_at: req.enabled_at,
                })
            })
            .transpose()?;

        Ok(Self {
            node_id: pr.id,
            state: pr.state.parse()?,
            merged: pr.merged,
            is_draft: pr.is_draft,
            is_in_merge_queue: pr.is_in_merge_queue,
            is_merge_queue_enabled: pr.is_merge_queue_enabled,
            merge_state_status: pr.merge_state_status.parse()?,
            auto_merge_request,
        })
    }
}

// REST response types for the git data API

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct GitCommit {
    tree: GitObject,
}

#[derive(Deserialize)]
struct GitTree {
    tree: Vec<GitTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct GitTreeItem {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct Comparison {
    #[serde(default)]
    files: Vec<ComparisonFile>,
}

#[derive(Deserialize)]
struct ComparisonFile {
    filename: String,
    status: String,
}

#[derive(Deserialize)]
struct CommitPull {
    number: u64,
    title: String,
    html_url: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// GitHub service for one repository
pub struct GitHubService {
    client: Octocrab,
    repo: RepoId,
    /// Token for raw HTTP requests (git data API)
    token: String,
    /// HTTP client for raw requests (git data API)
    http_client: Client,
    /// API base URL, no trailing slash
    api_url: String,
}

impl GitHubService {
    /// Create a service for `repo`, against `api_url` or api.github.com
    pub fn new(token: &str, repo: RepoId, api_url: Option<&str>) -> Result<Self> {
        let api_url = api_url
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_url.as_str())?
            .build()?;

        let http_client = Client::builder()
            .user_agent(concat!("files-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            repo,
            token: token.to_string(),
            http_client,
            api_url,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/repos/{}/{}/{path}",
            self.api_url, self.repo.owner, self.repo.name
        );
        self.http_client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send a request, turning non-success statuses into [`Error::Remote`]
    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(Error::remote(operation, format!("{status}: {message}")))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        Ok(self.send(operation, request).await?.json().await?)
    }

    async fn graphql<T: DeserializeOwned>(&self, operation: &str, query: &Value) -> Result<T> {
        let response: GraphQlResponse<T> = self
            .client
            .graphql(query)
            .await
            .map_err(|e| Error::remote(operation, format!("GraphQL request failed: {e}")))?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::remote(operation, messages.join(", ")));
        }

        response
            .data
            .ok_or_else(|| Error::remote(operation, "no data in GraphQL response"))
    }

    async fn tree_entry(&self, change: &TreeChange) -> Result<Value> {
        let entry = match &change.content {
            TreeContent::Deleted => json!({
                "path": change.path,
                "mode": change.mode,
                "type": "blob",
                "sha": Value::Null,
            }),
            TreeContent::Inline(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => json!({
                    "path": change.path,
                    "mode": change.mode,
                    "type": "blob",
                    "content": text,
                }),
                Err(_) => {
                    let sha = self.create_blob(bytes).await?;
                    json!({
                        "path": change.path,
                        "mode": change.mode,
                        "type": "blob",
                        "sha": sha,
                    })
                }
            },
        };
        Ok(entry)
    }

    async fn create_blob(&self, bytes: &[u8]) -> Result<String> {
        debug!(size = bytes.len(), "uploading binary blob");
        let blob: GitObject = self
            .send_json(
                "create_blob",
                self.request(Method::POST, "git/blobs").json(&json!({
                    "content": BASE64.encode(bytes),
                    "encoding": "base64",
                })),
            )
            .await?;
        Ok(blob.sha)
    }
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        base_ref: pr.base.ref_field.clone(),
        head_ref: pr.head.ref_field.clone(),
        base_sha: pr.base.sha.clone(),
        head_sha: pr.head.sha.clone(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        node_id: pr.node_id.clone(),
        is_draft: pr.draft.unwrap_or(false),
    }
}

fn change_status(status: &str) -> Option<ChangeStatus> {
    match status {
        "added" => Some(ChangeStatus::Added),
        "removed" => Some(ChangeStatus::Removed),
        "renamed" => Some(ChangeStatus::Renamed),
        "unchanged" => None,
        _ => Some(ChangeStatus::Modified),
    }
}

#[async_trait]
impl RepositoryHost for GitHubService {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn default_branch(&self) -> Result<String> {
        debug!(repo = %self.repo, "fetching default branch");
        let repo = self
            .client
            .repos(&self.repo.owner, &self.repo.name)
            .get()
            .await?;
        repo.default_branch
            .ok_or_else(|| Error::remote("default_branch", "repository has no default branch"))
    }

    async fn branch_sha(&self, branch: &str) -> Result<Option<String>> {
        debug!(branch, "fetching branch tip");
        let response = self
            .request(Method::GET, &format!("git/ref/heads/{branch}"))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(branch, "branch does not exist");
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::remote("branch_sha", format!("{status} for {branch}")));
        }

        let git_ref: GitRef = response.json().await?;
        Ok(Some(git_ref.object.sha))
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        debug!(branch, sha, "creating branch");
        self.send(
            "create_branch",
            self.request(Method::POST, "git/refs").json(&json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": sha,
            })),
        )
        .await?;
        Ok(())
    }

    async fn update_branch(&self, branch: &str, sha: &str, force: bool) -> Result<()> {
        debug!(branch, sha, force, "updating branch");
        self.send(
            "update_branch",
            self.request(Method::PATCH, &format!("git/refs/heads/{branch}"))
                .json(&json!({ "sha": sha, "force": force })),
        )
        .await?;
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "deleting branch");
        let response = self
            .request(Method::DELETE, &format!("git/refs/heads/{branch}"))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                debug!(branch, "branch already gone");
                Ok(())
            }
            s => Err(Error::remote("delete_branch", format!("{s} for {branch}"))),
        }
    }

    async fn list_tree(&self, commit_sha: &str, prefixes: &[String]) -> Result<Vec<TreeEntry>> {
        if prefixes.is_empty() {
            return Ok(Vec::new());
        }

        debug!(commit_sha, ?prefixes, "listing tree");
        let tree: GitTree = self
            .send_json(
                "list_tree",
                self.request(Method::GET, &format!("git/trees/{commit_sha}"))
                    .query(&[("recursive", "1")]),
            )
            .await?;

        if tree.truncated {
            warn!(commit_sha, "tree listing truncated by the host, deletions may be missed");
        }

        let mut entries: Vec<TreeEntry> = tree
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob")
            .filter(|item| prefixes.iter().any(|p| is_at_or_under(&item.path, p)))
            .map(|item| TreeEntry {
                path: item.path,
                mode: item.mode,
            })
            .collect();
        entries.sort();

        debug!(count = entries.len(), "listed tree entries");
        Ok(entries)
    }

    async fn create_tree(&self, parent_sha: &str, changes: &[TreeChange]) -> Result<String> {
        debug!(parent_sha, count = changes.len(), "creating tree");
        let parent: GitCommit = self
            .send_json(
                "create_tree",
                self.request(Method::GET, &format!("git/commits/{parent_sha}")),
            )
            .await?;

        let mut entries = Vec::with_capacity(changes.len());
        for change in changes {
            entries.push(self.tree_entry(change).await?);
        }

        let tree: GitObject = self
            .send_json(
                "create_tree",
                self.request(Method::POST, "git/trees").json(&json!({
                    "base_tree": parent.tree.sha,
                    "tree": entries,
                })),
            )
            .await?;

        debug!(tree_sha = %tree.sha, "created tree");
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String> {
        debug!(tree_sha, parent_sha, "creating commit");
        let commit: GitObject = self
            .send_json(
                "create_commit",
                self.request(Method::POST, "git/commits").json(&json!({
                    "message": message,
                    "tree": tree_sha,
                    "parents": [parent_sha],
                })),
            )
            .await?;

        debug!(sha = %commit.sha, "created commit");
        Ok(commit.sha)
    }

    async fn compare(&self, base_sha: &str, head_sha: &str) -> Result<Vec<ChangedFile>> {
        debug!(base_sha, head_sha, "comparing commits");
        let comparison: Comparison = self
            .send_json(
                "compare",
                self.request(Method::GET, &format!("compare/{base_sha}...{head_sha}")),
            )
            .await?;

        Ok(comparison
            .files
            .into_iter()
            .filter_map(|f| {
                change_status(&f.status).map(|status| ChangedFile {
                    path: f.filename,
                    status,
                })
            })
            .collect())
    }

    async fn find_open_pr(&self, head_branch: &str) -> Result<Option<PullRequest>> {
        debug!(head_branch, "finding existing PR");
        let head = format!("{}:{}", self.repo.owner, head_branch);

        let prs = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .list()
            .head(head)
            .state(octocrab::params::State::Open)
            .send()
            .await?;

        let result = prs
            .items
            .iter()
            .find(|pr| pr.head.ref_field == head_branch)
            .map(pr_from_octocrab);
        if let Some(ref pr) = result {
            debug!(pr_number = pr.number, "found existing PR");
        } else {
            debug!("no existing PR found");
        }
        Ok(result)
    }

    async fn create_pr(
        &self,
        head: &str,
        base: &str,
        content: &PullRequestContent,
    ) -> Result<PullRequest> {
        debug!(head, base, "creating PR");
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .create(&content.title, head, base)
            .body(&content.body)
            .send()
            .await?;

        let result = pr_from_octocrab(&pr);
        debug!(pr_number = result.number, "created PR");
        Ok(result)
    }

    async fn update_pr(&self, number: u64, content: &PullRequestContent) -> Result<PullRequest> {
        debug!(pr_number = number, "updating PR");
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .update(number)
            .title(&content.title)
            .body(&content.body)
            .send()
            .await?;

        Ok(pr_from_octocrab(&pr))
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        debug!(pr_number = number, "closing PR");
        self.client
            .issues(&self.repo.owner, &self.repo.name)
            .update(number)
            .state(octocrab::models::IssueState::Closed)
            .send()
            .await?;
        Ok(())
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        debug!(pr_number = number, ?labels, "adding labels");
        self.client
            .issues(&self.repo.owner, &self.repo.name)
            .add_labels(number, labels)
            .await?;
        Ok(())
    }

    async fn request_reviewers(
        &self,
        number: u64,
        reviewers: &[String],
        team_reviewers: &[String],
    ) -> Result<()> {
        debug!(pr_number = number, ?reviewers, ?team_reviewers, "requesting reviews");
        self.client
            .pulls(&self.repo.owner, &self.repo.name)
            .request_reviews(number, reviewers.to_vec(), team_reviewers.to_vec())
            .await?;
        Ok(())
    }

    async fn add_assignees(&self, number: u64, assignees: &[String]) -> Result<()> {
        debug!(pr_number = number, ?assignees, "adding assignees");
        let assignees: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(&self.repo.owner, &self.repo.name)
            .add_assignees(number, &assignees)
            .await?;
        Ok(())
    }

    async fn merge_signals(&self, number: u64) -> Result<MergeSignals> {
        debug!(pr_number = number, "fetching merge signals");
        let data: MergeSignalsData = self
            .graphql(
                "merge_signals",
                &json!({
                    "query": r"
                        query MergeSignals($owner: String!, $name: String!, $number: Int!) {
                            repository(owner: $owner, name: $name) {
                                pullRequest(number: $number) {
                                    id
                                    state
                                    isDraft
                                    merged
                                    mergeStateStatus
                                    isInMergeQueue
                                    isMergeQueueEnabled
                                    autoMergeRequest {
                                        enabledAt
                                        mergeMethod
                                    }
                                }
                            }
                        }
                    ",
                    "variables": {
                        "owner": self.repo.owner,
                        "name": self.repo.name,
                        "number": number,
                    }
                }),
            )
            .await?;

        let pr = data
            .repository
            .and_then(|r| r.pull_request)
            .ok_or_else(|| Error::MergeState(format!("PR #{number} not found")))?;

        let signals = MergeSignals::try_from(pr)?;
        debug!(
            pr_number = number,
            state = %signals.state,
            status = %signals.merge_state_status,
            in_queue = signals.is_in_merge_queue,
            "got merge signals"
        );
        Ok(signals)
    }

    async fn enable_auto_merge(
        &self,
        node_id: &str,
        method: MergeMethod,
        message: &MergeCommitMessage,
    ) -> Result<()> {
        debug!(node_id, %method, "enabling auto-merge");
        let _: Value = self
            .graphql(
                "enable_auto_merge",
                &json!({
                    "query": r"
                        mutation EnableAutoMerge(
                            $pullRequestId: ID!,
                            $mergeMethod: PullRequestMergeMethod!,
                            $commitHeadline: String,
                            $commitBody: String
                        ) {
                            enablePullRequestAutoMerge(input: {
                                pullRequestId: $pullRequestId,
                                mergeMethod: $mergeMethod,
                                commitHeadline: $commitHeadline,
                                commitBody: $commitBody
                            }) {
                                clientMutationId
                            }
                        }
                    ",
                    "variables": {
                        "pullRequestId": node_id,
                        "mergeMethod": method.graphql_name(),
                        "commitHeadline": message.headline,
                        "commitBody": message.body,
                    }
                }),
            )
            .await?;
        Ok(())
    }

    async fn disable_auto_merge(&self, node_id: &str) -> Result<()> {
        debug!(node_id, "disabling auto-merge");
        let _: Value = self
            .graphql(
                "disable_auto_merge",
                &json!({
                    "query": r"
                        mutation DisableAutoMerge($pullRequestId: ID!) {
                            disablePullRequestAutoMerge(input: { pullRequestId: $pullRequestId }) {
                                clientMutationId
                            }
                        }
                    ",
                    "variables": { "pullRequestId": node_id }
                }),
            )
            .await?;
        Ok(())
    }

    async fn merge_pr(
        &self,
        number: u64,
        method: MergeMethod,
        message: &MergeCommitMessage,
    ) -> Result<MergeResponse> {
        debug!(pr_number = number, %method, "merging PR");

        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let pulls = self.client.pulls(&self.repo.owner, &self.repo.name);
        let mut builder = pulls.merge(number).method(octocrab_method);
        if let Some(headline) = &message.headline {
            builder = builder.title(headline);
        }
        if let Some(body) = &message.body {
            builder = builder.message(body);
        }

        let result = builder
            .send()
            .await
            .map_err(|e| Error::remote("merge_pr", e.to_string()))?;

        let response = MergeResponse {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };
        debug!(
            pr_number = number,
            merged = response.merged,
            sha = ?response.sha,
            "merge complete"
        );
        Ok(response)
    }

    async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<LinkedPullRequest>> {
        debug!(sha, "finding PRs for commit");
        let pulls: Vec<CommitPull> = self
            .send_json(
                "pull_requests_for_commit",
                self.request(Method::GET, &format!("commits/{sha}/pulls")),
            )
            .await?;

        Ok(pulls
            .into_iter()
            .map(|p| LinkedPullRequest {
                number: p.number,
                title: p.title,
                html_url: p.html_url,
            })
            .collect())
    }
}
