//! Change set computation
//!
//! Pure comparison of a pattern's resolution against a destination tree
//! snapshot. No content comparison happens here: every resolved file is
//! resent and the host diff decides whether anything changed.

use crate::scope::ConfiguredScope;
use crate::types::{ResolvedFile, TreeChange, TreeContent, TreeEntry};
use std::collections::HashSet;

/// Writes and deletions for one destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files to write
    pub upserts: Vec<ResolvedFile>,
    /// Existing entries to remove
    pub deletions: Vec<TreeEntry>,
}

impl ChangeSet {
    /// No writes and no deletions
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }

    /// The tree mutation batch for this change set
    pub fn tree_changes(&self) -> Vec<TreeChange> {
        let upserts = self.upserts.iter().map(|f| TreeChange {
            path: f.to.clone(),
            mode: f.mode.as_str().to_string(),
            content: TreeContent::Inline(f.content.clone()),
        });
        let deletions = self.deletions.iter().map(|e| TreeChange {
            path: e.path.clone(),
            mode: e.mode.clone(),
            content: TreeContent::Deleted,
        });
        upserts.chain(deletions).collect()
    }
}

/// Build the change set for one destination
///
/// A tree entry is deleted when it is excluded, or when it is in scope and
/// no resolved file targets it.
pub fn build_change_set(
    scope: &ConfiguredScope,
    files: &[ResolvedFile],
    tree: &[TreeEntry],
) -> ChangeSet {
    let destinations: HashSet<&str> = files.iter().map(|f| f.to.as_str()).collect();

    let mut deletions: Vec<TreeEntry> = tree
        .iter()
        .filter(|entry| !destinations.contains(entry.path.as_str()))
        .filter(|entry| scope.is_excluded(&entry.path) || scope.owns(&entry.path))
        .cloned()
        .collect();
    deletions.sort();
    deletions.dedup();

    ChangeSet {
        upserts: files.to_vec(),
        deletions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileMode;
    use std::path::PathBuf;

    fn file(to: &str) -> ResolvedFile {
        ResolvedFile {
            from: PathBuf::from(format!("src/{to}")),
            to: to.to_string(),
            mode: FileMode::Regular,
            content: b"content".to_vec(),
        }
    }

    fn entry(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            mode: "100644".to_string(),
        }
    }

    fn deleted(changes: &ChangeSet) -> Vec<&str> {
        changes.deletions.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_stale_file_in_owned_directory_is_deleted() {
        let mut scope = ConfiguredScope::default();
        scope.claim_directory("ci");

        let changes = build_change_set(
            &scope,
            &[file("ci/a.yml")],
            &[entry("ci/a.yml"), entry("ci/old.yml"), entry("README.md")],
        );

        assert_eq!(changes.upserts.len(), 1);
        assert_eq!(deleted(&changes), vec!["ci/old.yml"]);
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_untouched() {
        let mut scope = ConfiguredScope::default();
        scope.claim_directory("foo");

        let changes = build_change_set(&scope, &[], &[entry("foo/x"), entry("foobar/x")]);

        assert_eq!(deleted(&changes), vec!["foo/x"]);
    }

    #[test]
    fn test_root_ownership_skips_subdirectories() {
        let mut scope = ConfiguredScope::default();
        scope.claim_root();

        let changes = build_change_set(
            &scope,
            &[file("README.md")],
            &[entry("README.md"), entry("OLD.md"), entry("docs/guide.md")],
        );

        assert_eq!(deleted(&changes), vec!["OLD.md"]);
    }

    #[test]
    fn test_excluded_path_is_deleted_even_outside_owned_paths() {
        let mut scope = ConfiguredScope::default();
        scope.claim_file("LICENSE");
        scope.exclude("ci/secret.yml");

        let changes = build_change_set(
            &scope,
            &[file("LICENSE")],
            &[entry("LICENSE"), entry("ci/secret.yml"), entry("ci/keep.yml")],
        );

        assert_eq!(deleted(&changes), vec!["ci/secret.yml"]);
    }

    #[test]
    fn test_empty_scope_deletes_nothing() {
        let scope = ConfiguredScope::default();
        let changes = build_change_set(&scope, &[], &[entry("README.md")]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_upserts_and_deletions_are_disjoint() {
        let mut scope = ConfiguredScope::default();
        scope.claim_directory("ci");

        let changes = build_change_set(
            &scope,
            &[file("ci/a.yml"), file("ci/b.yml")],
            &[entry("ci/a.yml"), entry("ci/b.yml")],
        );

        assert!(changes.deletions.is_empty());
        assert_eq!(changes.upserts.len(), 2);
    }

    #[test]
    fn test_tree_changes_tombstone_deletions() {
        let changes = ChangeSet {
            upserts: vec![ResolvedFile {
                mode: FileMode::Executable,
                ..file("bin/run")
            }],
            deletions: vec![entry("bin/old")],
        };

        let batch = changes.tree_changes();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].mode, "100755");
        assert_eq!(batch[0].content, TreeContent::Inline(b"content".to_vec()));
        assert_eq!(batch[1].path, "bin/old");
        assert_eq!(batch[1].content, TreeContent::Deleted);
    }
}
