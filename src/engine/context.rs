//! Run metadata and template contexts

use crate::config::Pattern;
use crate::types::{ChangeStatus, ChangedFile, LinkedPullRequest, RepoId};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Default web host for links
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Where the run comes from
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Source repository (`owner/name`)
    pub source_repository: Option<String>,
    /// Source commit
    pub source_sha: Option<String>,
    /// Web host, no trailing slash
    pub server_url: String,
    /// Workflow name
    pub workflow: Option<String>,
    /// Workflow run id
    pub run_id: Option<String>,
    /// Workflow run number
    pub run_number: Option<String>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            source_repository: None,
            source_sha: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            workflow: None,
            run_id: None,
            run_number: None,
        }
    }
}

/// One changed file as seen by PR templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeDescriptor {
    /// Source path, `None` for deletions
    pub from: Option<String>,
    /// Destination path
    pub to: String,
    /// Kind of change
    pub status: ChangeStatus,
    /// Source PR that introduced the change
    pub pull_request: Option<OriginPullRequest>,
}

/// Originating PR reference in templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginPullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL
    pub url: String,
}

impl From<&LinkedPullRequest> for OriginPullRequest {
    fn from(pr: &LinkedPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.html_url.clone(),
        }
    }
}

impl RunContext {
    fn source_url(&self) -> Option<String> {
        self.source_repository
            .as_ref()
            .map(|repo| format!("{}/{repo}", self.server_url))
    }

    fn run_url(&self) -> Option<String> {
        match (&self.source_repository, &self.run_id) {
            (Some(repo), Some(id)) => Some(format!("{}/{repo}/actions/runs/{id}", self.server_url)),
            _ => None,
        }
    }

    fn base(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "source".to_string(),
            json!({
                "repository": self.source_repository.clone().unwrap_or_default(),
                "sha": self.source_sha,
                "url": self.source_url(),
            }),
        );
        map.insert(
            "run".to_string(),
            json!({
                "id": self.run_id,
                "number": self.run_number,
                "workflow": self.workflow,
                "url": self.run_url(),
            }),
        );
        map
    }

    /// Context for rendering synced file contents: pattern variables at the
    /// top level, plus `source` and `run`
    pub fn file_context(&self, vars: &Map<String, Value>) -> Value {
        let mut map = vars.clone();
        map.extend(self.base());
        Value::Object(map)
    }

    /// Context for commit and PR text of one destination
    pub fn destination_context(&self, pattern: &Pattern, repo: &RepoId) -> Value {
        let mut map = self.base();
        map.insert("repository".to_string(), Value::String(repo.full_name()));
        map.insert("index".to_string(), json!(pattern.index));
        map.insert(
            "prefix".to_string(),
            Value::String(pattern.settings.branch.prefix.clone()),
        );
        map.insert(
            "vars".to_string(),
            Value::Object(pattern.template.clone().unwrap_or_default()),
        );
        map.insert("changes".to_string(), Value::Array(Vec::new()));
        Value::Object(map)
    }
}

/// Describe a commit diff for templates
pub fn describe_changes(
    diff: &[ChangedFile],
    sources: &HashMap<String, String>,
    origin: Option<&LinkedPullRequest>,
) -> Vec<ChangeDescriptor> {
    diff.iter()
        .map(|file| ChangeDescriptor {
            from: match file.status {
                ChangeStatus::Removed => None,
                _ => sources.get(&file.path).cloned(),
            },
            to: file.path.clone(),
            status: file.status,
            pull_request: origin.map(OriginPullRequest::from),
        })
        .collect()
}

/// Copy of `context` with `changes` set
pub fn with_changes(context: &Value, changes: &[ChangeDescriptor]) -> Value {
    let mut context = context.clone();
    if let Value::Object(map) = &mut context {
        map.insert(
            "changes".to_string(),
            serde_json::to_value(changes).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
    }
    context
}
