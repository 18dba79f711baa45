//! In-memory repository host for testing
//!
//! Models just enough of a git host to exercise the engine end to end:
//! trees, commits, branches and pull requests, with call tracking and
//! error injection.

#![allow(dead_code)]

use async_trait::async_trait;
use files_sync::error::{Error, Result};
use files_sync::platform::{HostConnector, RepositoryHost};
use files_sync::types::{
    ChangeStatus, ChangedFile, LinkedPullRequest, MergeCommitMessage, MergeMethod, MergeResponse,
    MergeSignals, MergeStateStatus, PrState, PullRequest, PullRequestContent, RepoId,
    TreeChange, TreeContent, TreeEntry,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Path → (mode, content)
pub type Tree = BTreeMap<String, (String, Vec<u8>)>;

#[derive(Debug, Clone)]
struct Commit {
    tree: String,
    parent: Option<String>,
    message: String,
}

#[derive(Debug, Clone)]
struct MockPr {
    number: u64,
    head: String,
    base: String,
    title: String,
    body: String,
    open: bool,
}

/// Call record for `update_branch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBranchCall {
    pub branch: String,
    pub sha: String,
    pub force: bool,
}

/// Call record for `merge_pr` and `enable_auto_merge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub target: String,
    pub method: MergeMethod,
    pub message: MergeCommitMessage,
}

/// In-memory repository host
///
/// Starts with a `main` branch holding one commit with the seeded files.
pub struct MockHost {
    repo: RepoId,
    next_id: AtomicU64,
    next_pr_number: AtomicU64,
    trees: Mutex<HashMap<String, Tree>>,
    commits: Mutex<HashMap<String, Commit>>,
    branches: Mutex<HashMap<String, String>>,
    prs: Mutex<Vec<MockPr>>,
    signals: Mutex<HashMap<u64, MergeSignals>>,
    linked_prs: Mutex<HashMap<String, Vec<LinkedPullRequest>>>,
    // Call tracking
    calls: Mutex<Vec<String>>,
    update_branch_calls: Mutex<Vec<UpdateBranchCall>>,
    merge_calls: Mutex<Vec<MergeCall>>,
    auto_merge_calls: Mutex<Vec<MergeCall>>,
    labels: Mutex<HashMap<u64, Vec<String>>>,
    reviewers: Mutex<HashMap<u64, (Vec<String>, Vec<String>)>>,
    assignees: Mutex<HashMap<u64, Vec<String>>>,
    // Error injection
    failing: Mutex<HashSet<String>>,
}

impl MockHost {
    /// Host for `owner/name[@base]` with an empty `main`
    pub fn new(id: &str) -> Self {
        let (full_name, base) = match id.split_once('@') {
            Some((full_name, base)) => (full_name, Some(base.to_string())),
            None => (id, None),
        };
        let (owner, name) = full_name.split_once('/').unwrap();
        let host = Self {
            repo: RepoId {
                owner: owner.to_string(),
                name: name.to_string(),
                base,
            },
            next_id: AtomicU64::new(1),
            next_pr_number: AtomicU64::new(1),
            trees: Mutex::new(HashMap::new()),
            commits: Mutex::new(HashMap::new()),
            branches: Mutex::new(HashMap::new()),
            prs: Mutex::new(Vec::new()),
            signals: Mutex::new(HashMap::new()),
            linked_prs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            update_branch_calls: Mutex::new(Vec::new()),
            merge_calls: Mutex::new(Vec::new()),
            auto_merge_calls: Mutex::new(Vec::new()),
            labels: Mutex::new(HashMap::new()),
            reviewers: Mutex::new(HashMap::new()),
            assignees: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        };
        let sha = host.store_commit(Tree::new(), None, "initial commit");
        host.branches
            .lock()
            .unwrap()
            .insert("main".to_string(), sha);
        host
    }

    /// Commit `files` on top of `branch` directly, as a human would
    pub fn push_files(&self, branch: &str, files: &[(&str, &str)]) -> String {
        let parent = self.branch_tip(branch);
        let mut tree = parent
            .as_deref()
            .map(|sha| self.tree_of_commit(sha))
            .unwrap_or_default();
        for (path, content) in files {
            tree.insert(
                (*path).to_string(),
                ("100644".to_string(), content.as_bytes().to_vec()),
            );
        }
        let sha = self.store_commit(tree, parent, "manual commit");
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.clone());
        sha
    }

    // === Error injection ===

    /// Make the named operation fail (e.g. `"create_commit"`)
    pub fn fail(&self, operation: &str) {
        self.failing.lock().unwrap().insert(operation.to_string());
    }

    /// Stop failing the named operation
    pub fn heal(&self, operation: &str) {
        self.failing.lock().unwrap().remove(operation);
    }

    // === Response setup ===

    /// Mergeability signals returned for a PR
    pub fn set_signals(&self, number: u64, signals: MergeSignals) {
        self.signals.lock().unwrap().insert(number, signals);
    }

    /// PRs returned by `pull_requests_for_commit`
    pub fn set_linked_prs(&self, sha: &str, prs: Vec<LinkedPullRequest>) {
        self.linked_prs
            .lock()
            .unwrap()
            .insert(sha.to_string(), prs);
    }

    // === Inspection ===

    /// Tip of a branch, `None` if missing
    pub fn branch_tip(&self, branch: &str) -> Option<String> {
        self.branches.lock().unwrap().get(branch).cloned()
    }

    /// Files on a branch as text
    pub fn branch_files(&self, branch: &str) -> BTreeMap<String, String> {
        let Some(sha) = self.branch_tip(branch) else {
            return BTreeMap::new();
        };
        self.tree_of_commit(&sha)
            .into_iter()
            .map(|(path, (_, content))| (path, String::from_utf8_lossy(&content).into_owned()))
            .collect()
    }

    /// Mode of a file on a branch
    pub fn file_mode(&self, branch: &str, path: &str) -> Option<String> {
        let sha = self.branch_tip(branch)?;
        self.tree_of_commit(&sha).get(path).map(|(mode, _)| mode.clone())
    }

    /// Message of a commit
    pub fn commit_message(&self, sha: &str) -> Option<String> {
        self.commits.lock().unwrap().get(sha).map(|c| c.message.clone())
    }

    /// Parent of a commit
    pub fn commit_parent(&self, sha: &str) -> Option<String> {
        self.commits
            .lock()
            .unwrap()
            .get(sha)
            .and_then(|c| c.parent.clone())
    }

    /// The open PR for a head branch
    pub fn open_pr(&self, head: &str) -> Option<PullRequest> {
        let prs = self.prs.lock().unwrap();
        prs.iter()
            .find(|p| p.open && p.head == head)
            .map(|p| self.to_pull_request(p))
    }

    /// Whether a PR is open
    pub fn is_open(&self, number: u64) -> bool {
        self.prs
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.number == number && p.open)
    }

    /// Title and body of a PR
    pub fn pr_content(&self, number: u64) -> Option<(String, String)> {
        self.prs
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.number == number)
            .map(|p| (p.title.clone(), p.body.clone()))
    }

    /// Number of PRs ever created
    pub fn pr_count(&self) -> usize {
        self.prs.lock().unwrap().len()
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times an operation was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == operation)
            .count()
    }

    /// Recorded `update_branch` calls
    pub fn update_branch_calls(&self) -> Vec<UpdateBranchCall> {
        self.update_branch_calls.lock().unwrap().clone()
    }

    /// Recorded `merge_pr` calls
    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    /// Recorded `enable_auto_merge` calls
    pub fn auto_merge_calls(&self) -> Vec<MergeCall> {
        self.auto_merge_calls.lock().unwrap().clone()
    }

    /// Labels added to a PR
    pub fn labels(&self, number: u64) -> Vec<String> {
        self.labels
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    /// Reviewers requested on a PR
    pub fn reviewers(&self, number: u64) -> (Vec<String>, Vec<String>) {
        self.reviewers
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    /// Assignees added to a PR
    pub fn assignees(&self, number: u64) -> Vec<String> {
        self.assignees
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    /// Assert no call whose name is in `operations` happened
    pub fn assert_not_called(&self, operations: &[&str]) {
        let calls = self.calls();
        for op in operations {
            assert!(
                !calls.iter().any(|c| c == op),
                "expected no {op} call, got {calls:?}"
            );
        }
    }

    // === Internals ===

    fn record(&self, operation: &str) -> Result<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.failing.lock().unwrap().contains(operation) {
            return Err(Error::remote(operation, "injected failure"));
        }
        Ok(())
    }

    fn next_sha(&self, kind: &str) -> String {
        format!("{kind}{:04}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn store_commit(&self, tree: Tree, parent: Option<String>, message: &str) -> String {
        let tree_sha = self.next_sha("tree");
        self.trees.lock().unwrap().insert(tree_sha.clone(), tree);
        let sha = self.next_sha("commit");
        self.commits.lock().unwrap().insert(
            sha.clone(),
            Commit {
                tree: tree_sha,
                parent,
                message: message.to_string(),
            },
        );
        sha
    }

    fn tree_of_commit(&self, sha: &str) -> Tree {
        let tree_sha = self
            .commits
            .lock()
            .unwrap()
            .get(sha)
            .map(|c| c.tree.clone());
        tree_sha
            .and_then(|t| self.trees.lock().unwrap().get(&t).cloned())
            .unwrap_or_default()
    }

    fn is_ancestor(&self, ancestor: &str, sha: &str) -> bool {
        let commits = self.commits.lock().unwrap();
        let mut current = Some(sha.to_string());
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = commits.get(&c).and_then(|c| c.parent.clone());
        }
        false
    }

    fn to_pull_request(&self, pr: &MockPr) -> PullRequest {
        let branches = self.branches.lock().unwrap();
        PullRequest {
            number: pr.number,
            html_url: format!(
                "https://github.com/{}/pull/{}",
                self.repo.full_name(),
                pr.number
            ),
            base_ref: pr.base.clone(),
            head_ref: pr.head.clone(),
            base_sha: branches.get(&pr.base).cloned().unwrap_or_default(),
            head_sha: branches.get(&pr.head).cloned().unwrap_or_default(),
            title: pr.title.clone(),
            node_id: Some(format!("PR_node_{}", pr.number)),
            is_draft: false,
        }
    }

    fn find_pr(&self, number: u64) -> Result<PullRequest> {
        let prs = self.prs.lock().unwrap();
        let pr = prs
            .iter()
            .find(|p| p.number == number)
            .ok_or_else(|| Error::remote("pull_request", format!("PR #{number} not found")))?;
        Ok(self.to_pull_request(pr))
    }
}

/// Default signals: open, clean, no merge queue
pub fn clean_signals(number: u64) -> MergeSignals {
    MergeSignals {
        node_id: format!("PR_node_{number}"),
        state: PrState::Open,
        merged: false,
        is_draft: false,
        is_in_merge_queue: false,
        is_merge_queue_enabled: false,
        merge_state_status: MergeStateStatus::Clean,
        auto_merge_request: None,
    }
}

#[async_trait]
impl RepositoryHost for MockHost {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn default_branch(&self) -> Result<String> {
        self.record("default_branch")?;
        Ok("main".to_string())
    }

    async fn branch_sha(&self, branch: &str) -> Result<Option<String>> {
        self.record("branch_sha")?;
        Ok(self.branch_tip(branch))
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.record("create_branch")?;
        let mut branches = self.branches.lock().unwrap();
        if branches.contains_key(branch) {
            return Err(Error::remote("create_branch", "Reference already exists"));
        }
        branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn update_branch(&self, branch: &str, sha: &str, force: bool) -> Result<()> {
        self.record("update_branch")?;
        self.update_branch_calls
            .lock()
            .unwrap()
            .push(UpdateBranchCall {
                branch: branch.to_string(),
                sha: sha.to_string(),
                force,
            });
        let current = self
            .branch_tip(branch)
            .ok_or_else(|| Error::remote("update_branch", "Reference does not exist"))?;
        if !force && !self.is_ancestor(&current, sha) {
            return Err(Error::remote("update_branch", "Update is not a fast forward"));
        }
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        self.record("delete_branch")?;
        self.branches.lock().unwrap().remove(branch);
        for pr in self.prs.lock().unwrap().iter_mut() {
            if pr.head == branch {
                pr.open = false;
            }
        }
        Ok(())
    }

    async fn list_tree(&self, commit_sha: &str, prefixes: &[String]) -> Result<Vec<TreeEntry>> {
        self.record("list_tree")?;
        let entries = self
            .tree_of_commit(commit_sha)
            .into_iter()
            .filter(|(path, _)| {
                prefixes.iter().any(|p| {
                    p.is_empty()
                        || path.as_str() == p.as_str()
                        || path.strip_prefix(p.as_str()).is_some_and(|r| r.starts_with('/'))
                })
            })
            .map(|(path, (mode, _))| TreeEntry { path, mode })
            .collect();
        Ok(entries)
    }

    async fn create_tree(&self, parent_sha: &str, changes: &[TreeChange]) -> Result<String> {
        self.record("create_tree")?;
        let mut tree = self.tree_of_commit(parent_sha);
        for change in changes {
            match &change.content {
                TreeContent::Inline(content) => {
                    tree.insert(change.path.clone(), (change.mode.clone(), content.clone()));
                }
                TreeContent::Deleted => {
                    tree.remove(&change.path);
                }
            }
        }
        let sha = self.next_sha("tree");
        self.trees.lock().unwrap().insert(sha.clone(), tree);
        Ok(sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String> {
        self.record("create_commit")?;
        if !self.trees.lock().unwrap().contains_key(tree_sha) {
            return Err(Error::remote("create_commit", "tree not found"));
        }
        let sha = self.next_sha("commit");
        self.commits.lock().unwrap().insert(
            sha.clone(),
            Commit {
                tree: tree_sha.to_string(),
                parent: Some(parent_sha.to_string()),
                message: message.to_string(),
            },
        );
        Ok(sha)
    }

    async fn compare(&self, base_sha: &str, head_sha: &str) -> Result<Vec<ChangedFile>> {
        self.record("compare")?;
        let base = self.tree_of_commit(base_sha);
        let head = self.tree_of_commit(head_sha);

        let mut changed = Vec::new();
        for (path, entry) in &head {
            match base.get(path) {
                None => changed.push(ChangedFile {
                    path: path.clone(),
                    status: ChangeStatus::Added,
                }),
                Some(old) if old != entry => changed.push(ChangedFile {
                    path: path.clone(),
                    status: ChangeStatus::Modified,
                }),
                Some(_) => {}
            }
        }
        for path in base.keys().filter(|p| !head.contains_key(*p)) {
            changed.push(ChangedFile {
                path: path.clone(),
                status: ChangeStatus::Removed,
            });
        }
        changed.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changed)
    }

    async fn find_open_pr(&self, head_branch: &str) -> Result<Option<PullRequest>> {
        self.record("find_open_pr")?;
        Ok(self.open_pr(head_branch))
    }

    async fn create_pr(
        &self,
        head: &str,
        base: &str,
        content: &PullRequestContent,
    ) -> Result<PullRequest> {
        self.record("create_pr")?;
        if self.branch_tip(head).is_none() {
            return Err(Error::remote("create_pr", format!("head '{head}' not found")));
        }
        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        let pr = MockPr {
            number,
            head: head.to_string(),
            base: base.to_string(),
            title: content.title.clone(),
            body: content.body.clone(),
            open: true,
        };
        let result = self.to_pull_request(&pr);
        self.prs.lock().unwrap().push(pr);
        Ok(result)
    }

    async fn update_pr(&self, number: u64, content: &PullRequestContent) -> Result<PullRequest> {
        self.record("update_pr")?;
        {
            let mut prs = self.prs.lock().unwrap();
            let pr = prs
                .iter_mut()
                .find(|p| p.number == number)
                .ok_or_else(|| Error::remote("update_pr", "not found"))?;
            pr.title.clone_from(&content.title);
            pr.body.clone_from(&content.body);
        }
        self.find_pr(number)
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        self.record("close_pr")?;
        let mut prs = self.prs.lock().unwrap();
        if let Some(pr) = prs.iter_mut().find(|p| p.number == number) {
            pr.open = false;
        }
        Ok(())
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.record("add_labels")?;
        self.labels
            .lock()
            .unwrap()
            .entry(number)
            .or_default()
            .extend(labels.iter().cloned());
        Ok(())
    }

    async fn request_reviewers(
        &self,
        number: u64,
        reviewers: &[String],
        team_reviewers: &[String],
    ) -> Result<()> {
        self.record("request_reviewers")?;
        self.reviewers
            .lock()
            .unwrap()
            .insert(number, (reviewers.to_vec(), team_reviewers.to_vec()));
        Ok(())
    }

    async fn add_assignees(&self, number: u64, assignees: &[String]) -> Result<()> {
        self.record("add_assignees")?;
        self.assignees
            .lock()
            .unwrap()
            .entry(number)
            .or_default()
            .extend(assignees.iter().cloned());
        Ok(())
    }

    async fn merge_signals(&self, number: u64) -> Result<MergeSignals> {
        self.record("merge_signals")?;
        Ok(self
            .signals
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_else(|| clean_signals(number)))
    }

    async fn enable_auto_merge(
        &self,
        node_id: &str,
        method: MergeMethod,
        message: &MergeCommitMessage,
    ) -> Result<()> {
        self.record("enable_auto_merge")?;
        self.auto_merge_calls.lock().unwrap().push(MergeCall {
            target: node_id.to_string(),
            method,
            message: message.clone(),
        });
        Ok(())
    }

    async fn disable_auto_merge(&self, _node_id: &str) -> Result<()> {
        self.record("disable_auto_merge")
    }

    async fn merge_pr(
        &self,
        number: u64,
        method: MergeMethod,
        message: &MergeCommitMessage,
    ) -> Result<MergeResponse> {
        self.record("merge_pr")?;
        self.merge_calls.lock().unwrap().push(MergeCall {
            target: number.to_string(),
            method,
            message: message.clone(),
        });
        if let Some(pr) = self
            .prs
            .lock()
            .unwrap()
            .iter_mut()
            .find(|p| p.number == number)
        {
            pr.open = false;
        }
        Ok(MergeResponse {
            merged: true,
            sha: Some(format!("merge{number:04}")),
            message: None,
        })
    }

    async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<LinkedPullRequest>> {
        self.record("pull_requests_for_commit")?;
        Ok(self
            .linked_prs
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hands out registered [`MockHost`]s by repository name
#[derive(Default)]
pub struct MockConnector {
    hosts: Mutex<HashMap<String, Arc<MockHost>>>,
}

impl MockConnector {
    /// Empty connector
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host for `owner/name[@base]` and return it
    pub fn add(&self, id: &str) -> Arc<MockHost> {
        let host = Arc::new(MockHost::new(id));
        self.hosts
            .lock()
            .unwrap()
            .insert(host.repo.full_name(), Arc::clone(&host));
        host
    }
}

#[async_trait]
impl HostConnector for MockConnector {
    async fn connect(&self, repo: &RepoId) -> Result<Arc<dyn RepositoryHost>> {
        let host = self
            .hosts
            .lock()
            .unwrap()
            .get(&repo.full_name())
            .cloned()
            .ok_or_else(|| Error::remote("connect", format!("unknown repository {repo}")))?;
        Ok(host as Arc<dyn RepositoryHost>)
    }
}
