//! Layered settings
//!
//! Every setting exists twice: as a `Partial*` struct where each field is
//! optional (what a config file says), and as a resolved struct where every
//! field has a value (what the engine uses). Resolution is a fold over
//! layers in a fixed order:
//!
//! 1. built-in defaults ([`PartialSettings::defaults`])
//! 2. the global `settings` block
//! 3. the pattern's own overrides
//!
//! A later layer wins field by field. Lists replace, they never concatenate.

use crate::types::{MergeMethod, MergeMode};
use serde::Deserialize;

/// Default commit subject
pub const DEFAULT_COMMIT_SUBJECT: &str = "chore: sync files from {{ source.repository }}";
/// Default commit body
pub const DEFAULT_COMMIT_BODY: &str = "";
/// Default commit message layout
pub const DEFAULT_COMMIT_FORMAT: &str = "{{ subject }}\n\n{{ body }}";
/// Default branch prefix
pub const DEFAULT_BRANCH_PREFIX: &str = "files-sync";
/// Default branch name layout
pub const DEFAULT_BRANCH_FORMAT: &str = "{{ prefix }}/{{ repository }}/pattern-{{ index }}";
/// Default PR title
pub const DEFAULT_PR_TITLE: &str = "Sync files from {{ source.repository }}";
/// Default PR body
pub const DEFAULT_PR_BODY: &str = "This pull request was created automatically to keep files in sync with {{ source.repository }}.

| File | Status | Origin |
| ---- | ------ | ------ |
{{#each changes}}| `{{ this.to }}` | {{ this.status }} | {{#if this.pull_request}}[#{{ this.pull_request.number }} {{ this.pull_request.title }}]({{ this.pull_request.url }}){{/if}} |
{{/each}}
{{#if run.url}}Workflow run: {{ run.url }}
{{/if}}";

/// Fill `$field` of `self` from `$over` when the override sets it
macro_rules! layer_fields {
    ($self:ident, $over:ident; $($field:ident),+ $(,)?) => {
        $( if $over.$field.is_some() { $self.$field = $over.$field; } )+
    };
}

/// Commit settings as written in config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialCommit {
    /// Message layout with `subject` and `body` placeholders
    pub format: Option<String>,
    /// Subject template
    pub subject: Option<String>,
    /// Body template
    pub body: Option<String>,
}

impl PartialCommit {
    fn layer(mut self, over: Self) -> Self {
        layer_fields!(self, over; format, subject, body);
        self
    }
}

/// Branch settings as written in config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialBranch {
    /// Branch prefix
    pub prefix: Option<String>,
    /// Branch name layout
    pub format: Option<String>,
}

impl PartialBranch {
    fn layer(mut self, over: Self) -> Self {
        layer_fields!(self, over; prefix, format);
        self
    }
}

/// Merge commit message settings as written in config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialMergeCommit {
    /// Headline template
    pub headline: Option<String>,
    /// Body template
    pub body: Option<String>,
}

impl PartialMergeCommit {
    fn layer(mut self, over: Self) -> Self {
        layer_fields!(self, over; headline, body);
        self
    }
}

/// Merge settings as written in config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialMerge {
    /// Requested merge mode
    pub mode: Option<MergeMode>,
    /// Merge method
    pub strategy: Option<MergeMethod>,
    /// Delete the sync branch after an immediate merge
    pub delete_branch: Option<bool>,
    /// Merge commit message
    pub commit: PartialMergeCommit,
}

impl PartialMerge {
    fn layer(mut self, over: Self) -> Self {
        layer_fields!(self, over; mode, strategy, delete_branch);
        self.commit = self.commit.layer(over.commit);
        self
    }
}

/// Pull request settings as written in config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialPullRequest {
    /// Push the branch but never open a PR
    pub disabled: Option<bool>,
    /// Rebuild the branch from the latest base on every run
    pub force: Option<bool>,
    /// Title template
    pub title: Option<String>,
    /// Body template
    pub body: Option<String>,
    /// User reviewers
    pub reviewers: Option<Vec<String>>,
    /// Team reviewers (team slugs)
    pub team_reviewers: Option<Vec<String>>,
    /// Assignees
    pub assignees: Option<Vec<String>>,
    /// Labels
    pub labels: Option<Vec<String>>,
    /// Merge settings
    pub merge: PartialMerge,
}

impl PartialPullRequest {
    fn layer(mut self, over: Self) -> Self {
        layer_fields!(
            self, over;
            disabled, force, title, body, reviewers, team_reviewers, assignees, labels,
        );
        self.merge = self.merge.layer(over.merge);
        self
    }
}

/// One layer of settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialSettings {
    /// Commit settings
    pub commit: PartialCommit,
    /// Branch settings
    pub branch: PartialBranch,
    /// Pull request settings
    pub pull_request: PartialPullRequest,
}

impl PartialSettings {
    /// The built-in bottom layer
    pub fn defaults() -> Self {
        Self {
            commit: PartialCommit {
                format: Some(DEFAULT_COMMIT_FORMAT.to_string()),
                subject: Some(DEFAULT_COMMIT_SUBJECT.to_string()),
                body: Some(DEFAULT_COMMIT_BODY.to_string()),
            },
            branch: PartialBranch {
                prefix: Some(DEFAULT_BRANCH_PREFIX.to_string()),
                format: Some(DEFAULT_BRANCH_FORMAT.to_string()),
            },
            pull_request: PartialPullRequest {
                disabled: Some(false),
                force: Some(false),
                title: Some(DEFAULT_PR_TITLE.to_string()),
                body: Some(DEFAULT_PR_BODY.to_string()),
                reviewers: Some(Vec::new()),
                team_reviewers: Some(Vec::new()),
                assignees: Some(Vec::new()),
                labels: Some(Vec::new()),
                merge: PartialMerge {
                    mode: Some(MergeMode::Disabled),
                    strategy: Some(MergeMethod::Merge),
                    delete_branch: Some(false),
                    commit: PartialMergeCommit::default(),
                },
            },
        }
    }

    /// Put `over` on top of `self`
    #[must_use]
    pub fn layer(self, over: Self) -> Self {
        Self {
            commit: self.commit.layer(over.commit),
            branch: self.branch.layer(over.branch),
            pull_request: self.pull_request.layer(over.pull_request),
        }
    }

    /// Resolve `defaults ← global ← pattern`
    pub fn resolve(global: &Self, pattern: &Self) -> Settings {
        Self::defaults()
            .layer(global.clone())
            .layer(pattern.clone())
            .finish()
    }

    /// Drop the optionality; gaps left by a missing defaults layer become empty
    fn finish(self) -> Settings {
        let Self {
            commit,
            branch,
            pull_request,
        } = self;
        let merge = pull_request.merge;

        Settings {
            commit: CommitSettings {
                format: commit.format.unwrap_or_default(),
                subject: commit.subject.unwrap_or_default(),
                body: commit.body.unwrap_or_default(),
            },
            branch: BranchSettings {
                prefix: branch.prefix.unwrap_or_default(),
                format: branch.format.unwrap_or_default(),
            },
            pull_request: PullRequestSettings {
                disabled: pull_request.disabled.unwrap_or_default(),
                force: pull_request.force.unwrap_or_default(),
                title: pull_request.title.unwrap_or_default(),
                body: pull_request.body.unwrap_or_default(),
                reviewers: pull_request.reviewers.unwrap_or_default(),
                team_reviewers: pull_request.team_reviewers.unwrap_or_default(),
                assignees: pull_request.assignees.unwrap_or_default(),
                labels: pull_request.labels.unwrap_or_default(),
                merge: MergeSettings {
                    mode: merge.mode.unwrap_or_default(),
                    strategy: merge.strategy.unwrap_or_default(),
                    delete_branch: merge.delete_branch.unwrap_or_default(),
                    commit_headline: merge.commit.headline,
                    commit_body: merge.commit.body,
                },
            },
        }
    }
}

/// Resolved commit settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSettings {
    /// Message layout
    pub format: String,
    /// Subject template
    pub subject: String,
    /// Body template
    pub body: String,
}

/// Resolved branch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSettings {
    /// Branch prefix
    pub prefix: String,
    /// Branch name layout
    pub format: String,
}

/// Resolved merge settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSettings {
    /// Requested merge mode
    pub mode: MergeMode,
    /// Merge method
    pub strategy: MergeMethod,
    /// Delete the sync branch after an immediate merge
    pub delete_branch: bool,
    /// Merge commit headline template
    pub commit_headline: Option<String>,
    /// Merge commit body template
    pub commit_body: Option<String>,
}

/// Resolved pull request settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PullRequestSettings {
    /// Push the branch but never open a PR
    pub disabled: bool,
    /// Rebuild the branch from the latest base on every run
    pub force: bool,
    /// Title template
    pub title: String,
    /// Body template
    pub body: String,
    /// User reviewers
    pub reviewers: Vec<String>,
    /// Team reviewers
    pub team_reviewers: Vec<String>,
    /// Assignees
    pub assignees: Vec<String>,
    /// Labels
    pub labels: Vec<String>,
    /// Merge settings
    pub merge: MergeSettings,
}

/// Fully resolved settings for one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Commit settings
    pub commit: CommitSettings,
    /// Branch settings
    pub branch: BranchSettings,
    /// Pull request settings
    pub pull_request: PullRequestSettings,
}
