//! Bounded directory walk that stops descending at map roots.

use crate::discovery::task::ScanCancellation;
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects descriptor files below `root`, in traversal order.
///
/// `root` is level 1. Directories up to level `max_depth` are checked for a
/// descriptor; nothing deeper is read. A directory holding a descriptor is
/// recorded and its subtree skipped. Unreadable entries are skipped.
pub(crate) fn find_descriptor_files(
    root: &Path,
    descriptor_file_name: &str,
    max_depth: usize,
    cancellation: &ScanCancellation,
) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if max_depth == 0 {
        return found;
    }

    let mut entries = WalkDir::new(root)
        .follow_links(true)
        .max_depth(max_depth - 1)
        .into_iter();

    while let Some(entry) = entries.next() {
        if cancellation.is_cancelled() {
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(
                    "event=walk_skip module=discovery status=skipped path={} error={}",
                    err.path().unwrap_or(root).display(),
                    err
                );
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let descriptor = entry.path().join(descriptor_file_name);
        if descriptor.is_file() {
            found.push(descriptor);
            entries.skip_current_dir();
        }
    }

    found
}
