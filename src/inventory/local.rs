//! Local side of a mapping: a recursive walk of the local root.

use chrono::{DateTime, Utc};
use jwalk::WalkDir;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ExcludePatterns, FileRecord, ReportingZone};
use crate::error::CollectionError;

/// Strip trailing separators from a configured root, keeping a bare `/`.
pub fn normalize_root(root: &Path) -> PathBuf {
    let text = root.to_string_lossy();
    let trimmed = text.trim_end_matches('/');
    if trimmed.is_empty() {
        root.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}

/// Join a logical prefix and a `/`-separated relative path.
pub fn join_logical(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Path of `path` below `root`, with components joined by `/`.
///
/// Returns `None` when the path is not under the root or is not valid UTF-8.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Collect every regular file under `root`.
///
/// Hidden files are included. Symlinks to files are followed and recorded
/// with the target's size and mtime; directory symlinks are not descended.
/// Each record's logical path is `logical_prefix/<path relative to root>`.
pub fn collect_local(
    root: &Path,
    logical_prefix: &str,
    excludes: &ExcludePatterns,
    zone: ReportingZone,
) -> Result<Vec<FileRecord>, CollectionError> {
    collect_local_until(root, logical_prefix, excludes, zone, &AtomicBool::new(false))
}

/// [`collect_local`] that gives up with [`CollectionError::Cancelled`] once
/// `cancel` is set.
pub fn collect_local_until(
    root: &Path,
    logical_prefix: &str,
    excludes: &ExcludePatterns,
    zone: ReportingZone,
    cancel: &AtomicBool,
) -> Result<Vec<FileRecord>, CollectionError> {
    let root = normalize_root(root);

    let root_meta = fs::metadata(&root)
        .map_err(|e| CollectionError::from_io_error(e, "walking", root.clone()))?;
    if !root_meta.is_dir() {
        return Err(CollectionError::Walk {
            root,
            message: "not a directory".to_string(),
        });
    }

    let mut records = Vec::new();

    for entry in WalkDir::new(&root).skip_hidden(false).follow_links(false) {
        if cancel.load(Ordering::Relaxed) {
            return Err(CollectionError::Cancelled { root: root.clone() });
        }

        let entry = entry.map_err(|e| CollectionError::Walk {
            root: root.clone(),
            message: e.to_string(),
        })?;

        let file_type = entry.file_type();
        if !file_type.is_file() && !file_type.is_symlink() {
            continue;
        }

        let path = entry.path();
        if path == root {
            continue;
        }
        let Some(relative) = relative_key(&root, &path) else {
            tracing::warn!(path = %path.display(), "Skipping file without a usable relative key");
            continue;
        };

        if excludes.is_excluded(&relative) {
            tracing::trace!(path = %relative, "Excluded");
            continue;
        }

        let metadata = if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_file() => target,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping dangling symlink");
                    continue;
                }
            }
        } else {
            entry.metadata().map_err(|e| CollectionError::Walk {
                root: root.clone(),
                message: format!("{}: {}", path.display(), e),
            })?
        };
        let modified = metadata
            .modified()
            .map_err(|e| CollectionError::from_io_error(e, "reading mtime of", path.clone()))?;

        records.push(FileRecord::new(
            metadata.len(),
            zone.localize(&DateTime::<Utc>::from(modified)),
            join_logical(logical_prefix, &relative),
        ));
    }

    tracing::debug!(root = %root.display(), files = records.len(), "Local inventory collected");
    Ok(records)
}
