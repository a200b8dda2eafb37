//! Catalog path handling.
//!
//! Catalog paths are relative to the mirrored root, use `/` separators, and
//! never start or end with a slash. The root itself is the empty string.

use crate::error::{Result, SyncError};
use std::path::{Component, Path, PathBuf};

/// Normalize a caller-supplied path into catalog form.
///
/// `""`, `"/"` and `"."` all name the root. Backslashes are treated as
/// separators; `..` segments are rejected.
pub fn normalize(input: &str) -> Result<String> {
    let unified = input.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(SyncError::invalid_path(format!(
                    "'{input}' escapes the mirrored root"
                )))
            }
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

/// Parent of a catalog path (`""` for root-level entries and the root).
pub fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Last segment of a catalog path.
pub fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Append one segment to a catalog path.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Lowercased extension from the last dot, dot included (`"Clip.MP4"` → `".mp4"`).
pub fn extension_of(name: &str) -> String {
    name.rfind('.')
        .map(|idx| name[idx..].to_lowercase())
        .unwrap_or_default()
}

/// Path of `path` relative to `root`, joined with `/` on every platform.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Filesystem location of a catalog path under `root`.
pub fn to_fs_path(root: &Path, catalog_path: &str) -> PathBuf {
    catalog_path
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Whether `name` is usable as a single path segment.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
