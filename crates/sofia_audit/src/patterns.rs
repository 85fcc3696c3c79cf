//! Shared file-name glob helpers.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::error::{AuditError, Result};

/// Build a case-insensitive glob set from file-name patterns.
///
/// Patterns are matched against the bare file name, never the full path, so
/// `collect-*.ts` matches at any depth.
pub fn build_name_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for raw in patterns {
        let raw = raw.as_ref().trim();
        let glob = GlobBuilder::new(raw)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| AuditError::Pattern(format!("invalid pattern '{}': {}", raw, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AuditError::Pattern(e.to_string()))
}

/// File name of `path` as UTF-8, if it has one.
pub fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// File name without its final extension.
pub fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|n| n.to_str())
}

/// Match `path`'s file name against `set`.
pub fn name_matches(set: &GlobSet, path: &Path) -> bool {
    file_name(path).map(|n| set.is_match(n)).unwrap_or(false)
}

/// `path` relative to `root`, `/`-separated.
pub fn display_relative(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            std::path::Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
