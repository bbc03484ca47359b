//! Directory expansion into flat, canonically ordered file lists
//!
//! Consumers diff logs structurally, so expansion must produce the same
//! order regardless of filesystem enumeration order: entries are sorted by
//! name at every directory level and subdirectories are recursed in sorted
//! position.

use crate::digest::{HashFunction, compute_digest};
use crate::record::FileRecord;
use crate::spawn::InputMetadataProvider;
use std::path::Path;
use walkdir::WalkDir;

/// Expand a directory into its file members, sorted by name at every level.
///
/// Symlinks are not followed. Each file's path is expressed relative to
/// `exec_root`, or kept absolute if it lies outside it. I/O errors during
/// traversal or digesting are logged at `warn` and the partial result is
/// returned; a build should not abort solely because the log could not
/// fully describe a directory.
#[must_use]
pub fn expand_directory(
    dir: &Path,
    exec_root: &Path,
    provider: Option<&dyn InputMetadataProvider>,
    hash_function: HashFunction,
) -> Vec<FileRecord> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Error listing directory for spawn log");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let child = entry.path();
        let record_path = child
            .strip_prefix(exec_root)
            .unwrap_or(child)
            .to_string_lossy()
            .into_owned();
        match compute_digest(None, child, provider, hash_function) {
            Ok(digest) => files.push(FileRecord {
                path: record_path,
                digest: Some(digest),
                is_tool: false,
            }),
            Err(e) => {
                tracing::warn!(path = %child.display(), error = %e, "Error digesting directory member");
            }
        }
    }

    files
}
