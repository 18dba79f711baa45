//! Shared test utilities

#![allow(dead_code)]

mod mock_host;

pub use mock_host::{MergeCall, MockConnector, MockHost, UpdateBranchCall, clean_signals};

use async_trait::async_trait;
use files_sync::config::{Config, Pattern};
use files_sync::engine::{DestinationOutcome, Engine, ProgressCallback, RunContext};
use files_sync::scope::LocalFs;
use files_sync::types::RepoId;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A throwaway source checkout
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file, creating parent directories
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    /// Remove a file or directory
    pub fn remove(&self, rel: &str) {
        let path = self.dir.path().join(rel);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }
}

/// Validated patterns from YAML config text
pub fn patterns(yaml: &str) -> Vec<Pattern> {
    Config::from_yaml(yaml).unwrap().patterns().unwrap()
}

/// Run metadata for a typical workflow run
pub fn run_context() -> RunContext {
    RunContext {
        source_repository: Some("acme/templates".to_string()),
        source_sha: Some("abc123".to_string()),
        workflow: Some("sync".to_string()),
        run_id: Some("42".to_string()),
        run_number: Some("7".to_string()),
        ..RunContext::default()
    }
}

/// Engine over `source`, reaching hosts through `connector`
pub fn engine(connector: &Arc<MockConnector>, source: &SourceTree) -> Engine {
    Engine::new(
        Arc::clone(connector) as Arc<dyn files_sync::platform::HostConnector>,
        Arc::new(LocalFs::new(source.path())),
        run_context(),
    )
}

/// Progress sink that remembers what it was told
#[derive(Default)]
pub struct RecordingProgress {
    pub messages: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub outcomes: Mutex<Vec<(String, DestinationOutcome)>>,
}

impl RecordingProgress {
    pub fn outcomes(&self) -> Vec<(String, DestinationOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// The single recorded outcome
    pub fn only_outcome(&self) -> DestinationOutcome {
        let outcomes = self.outcomes();
        assert_eq!(outcomes.len(), 1, "expected one outcome, got {outcomes:?}");
        outcomes[0].1.clone()
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_pattern(&self, _index: usize, _total: usize, _destinations: usize) {}

    async fn on_destination(&self, _repo: &RepoId, _branch: &str) {}

    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    async fn on_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    async fn on_outcome(&self, repo: &RepoId, outcome: &DestinationOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((repo.full_name(), outcome.clone()));
    }
}
