//! Scope resolution
//!
//! Turns a pattern's file specs into:
//! - the [`ConfiguredScope`]: every destination path the pattern claims,
//!   whether or not the source currently has a file for it
//! - the [`ResolvedFile`](crate::types::ResolvedFile) list: what to write

mod fs;
mod resolve;

pub use fs::{FileStat, LocalFs, SourceFs};
pub use resolve::{ExcludeMatcher, Resolution, ScopeResolver};

use std::collections::BTreeSet;

/// Destination paths a pattern is responsible for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfiguredScope {
    owns_root: bool,
    directories: BTreeSet<String>,
    files: BTreeSet<String>,
    excluded: BTreeSet<String>,
}

impl ConfiguredScope {
    /// Claim files directly in the repository root (not subdirectories)
    pub fn claim_root(&mut self) {
        self.owns_root = true;
    }

    /// Claim a directory and everything under it; `""` claims the root
    pub fn claim_directory(&mut self, dir: &str) {
        let dir = normalize_dest(dir);
        if dir.is_empty() {
            self.claim_root();
        } else {
            self.directories.insert(dir);
        }
    }

    /// Claim exactly one path
    pub fn claim_file(&mut self, path: &str) {
        self.files.insert(normalize_dest(path));
    }

    /// Mark a path as excluded: deleted if present, never synced
    pub fn exclude(&mut self, path: &str) {
        self.excluded.insert(normalize_dest(path));
    }

    /// Nothing claimed at all
    pub fn is_empty(&self) -> bool {
        !self.owns_root
            && self.directories.is_empty()
            && self.files.is_empty()
            && self.excluded.is_empty()
    }

    /// Whether `path` falls inside the claimed scope
    ///
    /// Directory claims match on a `/` boundary: `foo` owns `foo` and
    /// `foo/x` but not `foobar/x`. The root claim only covers paths without
    /// a `/`.
    pub fn owns(&self, path: &str) -> bool {
        if self.files.contains(path) {
            return true;
        }
        if self.owns_root && !path.contains('/') {
            return true;
        }
        self.directories.iter().any(|dir| is_at_or_under(path, dir))
    }

    /// Whether `path` was explicitly excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.contains(path)
    }

    /// Excluded paths, sorted
    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    /// Path prefixes the destination tree listing must cover
    ///
    /// `""` means the whole tree. Prefixes already covered by a claimed
    /// directory are dropped.
    pub fn tree_prefixes(&self) -> Vec<String> {
        if self.owns_root {
            return vec![String::new()];
        }

        let candidates: BTreeSet<&String> = self
            .directories
            .iter()
            .chain(&self.files)
            .chain(&self.excluded)
            .collect();

        candidates
            .iter()
            .filter(|p| {
                !self
                    .directories
                    .iter()
                    .any(|dir| dir != **p && is_at_or_under(p, dir))
            })
            .map(|p| (*p).clone())
            .collect()
    }

    /// Union with another scope
    pub fn extend(&mut self, other: Self) {
        self.owns_root |= other.owns_root;
        self.directories.extend(other.directories);
        self.files.extend(other.files);
        self.excluded.extend(other.excluded);
    }
}

/// `path == dir` or `path` is below `dir`
pub(crate) fn is_at_or_under(path: &str, dir: &str) -> bool {
    dir.is_empty()
        || path == dir
        || (path.len() > dir.len()
            && path.starts_with(dir)
            && path.as_bytes()[dir.len()] == b'/')
}

/// Normalize a destination path: `/`-separated, no `.` components, no
/// leading or trailing separators; the root becomes `""`
pub fn normalize_dest(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a normalized directory and a relative path
pub(crate) fn join_dest(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        normalize_dest(relative)
    } else {
        format!("{dir}/{}", normalize_dest(relative))
    }
}
