//! Sync configuration
//!
//! A config file declares global `settings` and an ordered list of
//! `patterns`. Loading parses the file; [`Config::patterns`] validates it
//! and resolves each pattern's layered settings.

mod layers;

pub use layers::{
    BranchSettings, CommitSettings, MergeSettings, PartialBranch, PartialCommit, PartialMerge,
    PartialMergeCommit, PartialPullRequest, PartialSettings, PullRequestSettings, Settings,
    DEFAULT_BRANCH_FORMAT, DEFAULT_BRANCH_PREFIX, DEFAULT_PR_BODY, DEFAULT_PR_TITLE,
};

use crate::error::{Error, Result};
use crate::platform::parse_repo_id;
use crate::types::RepoId;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".github/files-sync.yml";

/// Parsed config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Global settings layer
    #[serde(default)]
    pub settings: PartialSettings,
    /// Sync rules, in declaration order
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
}

/// One pattern as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    /// Files to sync
    #[serde(default)]
    pub files: Vec<FileEntry>,
    /// Destination repositories
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Variables for rendering file contents
    #[serde(default)]
    pub template: Option<Map<String, Value>>,
    /// Commit overrides
    #[serde(default)]
    pub commit: PartialCommit,
    /// Branch overrides
    #[serde(default)]
    pub branch: PartialBranch,
    /// Pull request overrides
    #[serde(default)]
    pub pull_request: PartialPullRequest,
}

/// A file entry: either a bare path or a full spec
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    /// `path` syncs to the same path
    Path(String),
    /// `{ from, to, exclude }`
    Spec {
        /// Source file or directory
        from: String,
        /// Destination path (defaults to `from`)
        #[serde(default)]
        to: Option<String>,
        /// Globs relative to `from`
        #[serde(default)]
        exclude: Vec<String>,
    },
}

/// A validated file mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    /// Source path, relative to the working directory
    pub from: PathBuf,
    /// Destination path as written (`.` for the repository root)
    pub to: String,
    /// Globs relative to `from`
    pub exclude: Vec<String>,
}

impl FileSpec {
    /// Spec with no excludes
    pub fn new(from: impl Into<PathBuf>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            exclude: Vec::new(),
        }
    }

    /// Builder-style excludes
    #[must_use]
    pub fn with_exclude(mut self, exclude: &[&str]) -> Self {
        self.exclude = exclude.iter().map(ToString::to_string).collect();
        self
    }
}

/// A validated sync rule
#[derive(Debug, Clone)]
pub struct Pattern {
    /// 1-based position in the config file
    pub index: usize,
    /// File mappings, in declaration order
    pub files: Vec<FileSpec>,
    /// Destination repositories, in declaration order
    pub repositories: Vec<RepoId>,
    /// Variables for rendering file contents (`None` disables rendering)
    pub template: Option<Map<String, Value>>,
    /// Resolved settings
    pub settings: Settings,
}

impl Config {
    /// Load a config file, choosing the format from its extension
    ///
    /// `.toml` is parsed as TOML; anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        debug!(path = %path.display(), is_toml, "loading config");
        let parsed = if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_yaml(&content)
        };

        parsed.map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse YAML config text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Parse TOML config text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate every pattern and resolve its settings
    pub fn patterns(&self) -> Result<Vec<Pattern>> {
        if self.patterns.is_empty() {
            return Err(Error::Config("no patterns configured".to_string()));
        }

        self.patterns
            .iter()
            .enumerate()
            .map(|(i, raw)| self.validate_pattern(i + 1, raw))
            .collect()
    }

    fn validate_pattern(&self, index: usize, raw: &PatternConfig) -> Result<Pattern> {
        let invalid = |msg: String| Error::Config(format!("pattern {index}: {msg}"));

        if raw.repositories.is_empty() {
            return Err(invalid("no repositories configured".to_string()));
        }

        let repositories = raw
            .repositories
            .iter()
            .map(|r| parse_repo_id(r).map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let files = raw
            .files
            .iter()
            .map(|entry| file_spec_from_entry(entry).map_err(invalid))
            .collect::<Result<Vec<_>>>()?;

        let overrides = PartialSettings {
            commit: raw.commit.clone(),
            branch: raw.branch.clone(),
            pull_request: raw.pull_request.clone(),
        };

        Ok(Pattern {
            index,
            files,
            repositories,
            template: raw.template.clone(),
            settings: PartialSettings::resolve(&self.settings, &overrides),
        })
    }
}

fn file_spec_from_entry(entry: &FileEntry) -> std::result::Result<FileSpec, String> {
    let (from, to, exclude) = match entry {
        FileEntry::Path(path) => (path.as_str(), None, Vec::new()),
        FileEntry::Spec { from, to, exclude } => (from.as_str(), to.as_deref(), exclude.clone()),
    };

    let from = from.trim();
    if from.is_empty() {
        return Err("file entry with empty 'from'".to_string());
    }
    if Path::new(from).is_absolute() || from.split(['/', '\\']).any(|c| c == "..") {
        return Err(format!("'{from}' must be a relative path inside the workspace"));
    }

    let to = to.map_or(from, str::trim);
    if to.split('/').any(|c| c == "..") {
        return Err(format!("destination '{to}' must stay inside the repository"));
    }

    Ok(FileSpec {
        from: PathBuf::from(from),
        to: to.to_string(),
        exclude,
    })
}
