//! Expanding file specs against the source tree

use super::{ConfiguredScope, SourceFs, join_dest, normalize_dest};
use crate::config::FileSpec;
use crate::error::{Error, Result};
use crate::template;
use crate::types::{FileMode, ResolvedFile};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Output of resolving one pattern
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Claimed destination paths
    pub scope: ConfiguredScope,
    /// Files to write, sorted by destination, one per destination
    pub files: Vec<ResolvedFile>,
}

/// Exclude globs of one spec, matched against `/`-separated paths relative
/// to the spec's `from` directory
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    set: GlobSet,
}

impl ExcludeMatcher {
    /// Compile exclude globs
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid exclude pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid exclude patterns: {e}")))?;
        Ok(Self { set })
    }

    /// A path matches if it or any of its parent directories matches
    pub fn matches(&self, relative: &str) -> bool {
        if self.set.is_empty() {
            return false;
        }
        let mut candidate = relative;
        loop {
            if self.set.is_match(candidate) {
                return true;
            }
            match candidate.rfind('/') {
                Some(i) => candidate = &candidate[..i],
                None => return false,
            }
        }
    }
}

/// Resolves file specs through a [`SourceFs`]
#[derive(Clone)]
pub struct ScopeResolver {
    fs: Arc<dyn SourceFs>,
}

impl ScopeResolver {
    /// Resolver over the given filesystem
    pub fn new(fs: Arc<dyn SourceFs>) -> Self {
        Self { fs }
    }

    /// Resolve all specs of a pattern
    ///
    /// Specs are resolved concurrently and combined only once every one of
    /// them succeeded. When `template` is set, UTF-8 file contents are
    /// rendered against it.
    pub async fn resolve(&self, specs: &[FileSpec], template: Option<&Value>) -> Result<Resolution> {
        let handles: Vec<_> = specs
            .iter()
            .cloned()
            .map(|spec| {
                let fs = Arc::clone(&self.fs);
                tokio::task::spawn_blocking(move || resolve_spec(fs.as_ref(), &spec))
            })
            .collect();

        let mut parts = Vec::with_capacity(handles.len());
        for handle in handles {
            let part = handle
                .await
                .map_err(|e| Error::Internal(format!("file resolution task failed: {e}")))??;
            parts.push(part);
        }

        let mut resolution = combine(parts);

        if let Some(context) = template {
            for file in &mut resolution.files {
                render_content(file, context)?;
            }
        }

        debug!(
            files = resolution.files.len(),
            scope_empty = resolution.scope.is_empty(),
            "resolved pattern files"
        );
        Ok(resolution)
    }
}

/// Later specs win on destination collisions; exclusions win over syncs
fn combine(parts: Vec<Resolution>) -> Resolution {
    let mut scope = ConfiguredScope::default();
    let mut by_dest: BTreeMap<String, ResolvedFile> = BTreeMap::new();

    for part in parts {
        scope.extend(part.scope);
        for file in part.files {
            if let Some(previous) = by_dest.insert(file.to.clone(), file) {
                warn!(
                    to = %previous.to,
                    from = %previous.from.display(),
                    "destination mapped more than once, later entry wins"
                );
            }
        }
    }

    by_dest.retain(|to, _| !scope.is_excluded(to));

    Resolution {
        scope,
        files: by_dest.into_values().collect(),
    }
}

fn resolve_spec(fs: &dyn SourceFs, spec: &FileSpec) -> Result<Resolution> {
    let mut resolution = Resolution::default();
    let to = normalize_dest(&spec.to);

    let Some(stat) = fs.stat(&spec.from)? else {
        debug!(from = %spec.from.display(), to = %to, "source missing, claiming destination only");
        // A deleted source may have been a file or a directory. The directory
        // claim covers the exact path too.
        resolution.scope.claim_directory(&to);
        return Ok(resolution);
    };

    if stat.is_dir {
        let excludes = ExcludeMatcher::new(&spec.exclude)?;
        resolution.scope.claim_directory(&to);

        for relative in fs.list_files_recursive(&spec.from)? {
            let relative_str = slash_path(&relative);
            let dest = join_dest(&to, &relative_str);

            if excludes.matches(&relative_str) {
                debug!(path = %relative_str, "excluded");
                resolution.scope.exclude(&dest);
                continue;
            }

            let source = spec.from.join(&relative);
            resolution.files.push(read_file(fs, &source, dest)?);
        }
    } else {
        if !spec.exclude.is_empty() {
            warn!(
                from = %spec.from.display(),
                "exclude patterns only apply to directories, ignoring"
            );
        }

        let dest = file_destination(spec, &to);
        resolution.scope.claim_file(&dest);
        resolution.files.push(read_file(fs, &spec.from, dest)?);
    }

    Ok(resolution)
}

/// `to` is used verbatim unless it names the root or ends with `/`, in which
/// case the file keeps its own name inside that directory
fn file_destination(spec: &FileSpec, to: &str) -> String {
    let into_directory = to.is_empty() || spec.to.ends_with('/');
    if !into_directory {
        return to.to_string();
    }
    let name = spec
        .from
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    join_dest(to, &name)
}

fn read_file(fs: &dyn SourceFs, source: &Path, to: String) -> Result<ResolvedFile> {
    let stat = fs
        .stat(source)?
        .ok_or_else(|| Error::resolution(source, "file disappeared during resolution"))?;
    let content = fs.read(source)?;

    Ok(ResolvedFile {
        from: source.to_path_buf(),
        to,
        mode: if stat.executable {
            FileMode::Executable
        } else {
            FileMode::Regular
        },
        content,
    })
}

fn render_content(file: &mut ResolvedFile, context: &Value) -> Result<()> {
    let Ok(text) = std::str::from_utf8(&file.content) else {
        debug!(path = %file.to, "binary content, not rendering");
        return Ok(());
    };
    let rendered = template::render_lenient(text, context)
        .map_err(|e| Error::resolution(&file.from, e.to_string()))?;
    file.content = rendered.into_bytes();
    Ok(())
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
