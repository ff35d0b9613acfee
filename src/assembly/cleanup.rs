//! Post-merge cleanup of page images
//!
//! Cleanup is best-effort: a page image or directory that cannot be removed
//! is logged and left behind, never an error. The merged PDF is already on
//! disk by the time this runs, so leftovers only waste space.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Delete a document's page images and remove its working directory.
///
/// Only `.jpg` files are deleted; the directory removal is non-recursive, so
/// a directory holding anything else is left in place with a warning.
pub async fn cleanup_images(doc_dir: &Path) {
    let mut entries = match fs::read_dir(doc_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %doc_dir.display(), error = %e, "could not read page directory during cleanup");
            return;
        }
    };

    let mut deleted = 0usize;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_jpg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        if !is_jpg {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete page image"),
        }
    }

    match fs::remove_dir(doc_dir).await {
        Ok(()) => debug!(dir = %doc_dir.display(), deleted, "cleaned up page images"),
        Err(e) => warn!(dir = %doc_dir.display(), error = %e, "could not remove page directory"),
    }
}
