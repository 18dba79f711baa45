//! Repository identifier parsing

use crate::error::{Error, Result};
use crate::types::RepoId;
use url::Url;

/// Parse a repository identifier
///
/// Accepted forms, each optionally followed by `@base-branch`:
/// - `owner/name`
/// - `https://github.com/owner/name` (with or without `.git`)
/// - `git@github.com:owner/name.git`
pub fn parse_repo_id(input: &str) -> Result<RepoId> {
    let input = input.trim();
    let invalid = |why: &str| Error::Config(format!("invalid repository '{input}': {why}"));

    let path = if input.contains("://") {
        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        url.path().trim_matches('/').to_string()
    } else if let Some(rest) = input.strip_prefix("git@") {
        let (_, path) = rest
            .split_once(':')
            .ok_or_else(|| invalid("expected git@host:owner/name"))?;
        path.trim_matches('/').to_string()
    } else {
        input.to_string()
    };

    let (slug, base) = match path.split_once('@') {
        Some((slug, base)) => {
            if base.is_empty() {
                return Err(invalid("empty base branch after '@'"));
            }
            (slug, Some(base.to_string()))
        }
        None => (path.as_str(), None),
    };

    let mut parts = slug.split('/');
    let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("expected owner/name"));
    };
    let name = name.strip_suffix(".git").unwrap_or(name);

    if !is_valid_segment(owner) || !is_valid_segment(name) {
        return Err(invalid("expected owner/name"));
    }

    Ok(RepoId {
        owner: owner.to_string(),
        name: name.to_string(),
        base,
    })
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
