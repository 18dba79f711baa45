//! Source filesystem access

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What `stat` reports about an existing path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Path is a directory
    pub is_dir: bool,
    /// Any executable bit is set
    pub executable: bool,
}

/// Read access to the source tree
///
/// Paths are relative to the source root. A missing path is `Ok(None)`
/// from [`stat`](Self::stat), never an error.
pub trait SourceFs: Send + Sync {
    /// Stat a path, `None` if it does not exist
    fn stat(&self, path: &Path) -> Result<Option<FileStat>>;

    /// Read a file's bytes
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// All files under `dir`, relative to `dir`, sorted
    fn list_files_recursive(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// [`SourceFs`] over the local disk
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Filesystem rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceFs for LocalFs {
    fn stat(&self, path: &Path) -> Result<Option<FileStat>> {
        let full = self.root.join(path);
        match fs::metadata(&full) {
            Ok(meta) => Ok(Some(FileStat {
                is_dir: meta.is_dir(),
                executable: is_executable(&meta),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::resolution(path, format!("stat failed: {e}"))),
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(self.root.join(path))
            .map_err(|e| Error::resolution(path, format!("read failed: {e}")))
    }

    fn list_files_recursive(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let base = self.root.join(dir);
        let mut files = Vec::new();

        let walker = WalkDir::new(&base)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

        for entry in walker {
            let entry =
                entry.map_err(|e| Error::resolution(dir, format!("directory walk failed: {e}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&base)
                .map_err(|e| Error::Internal(format!("walked outside {}: {e}", base.display())))?;
            files.push(relative.to_path_buf());
        }

        Ok(files)
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}
