//! Reclaiming space from failed downloads
//!
//! Every top-level entry of the cache root below the size threshold is
//! deleted outright. There is no dry run: a legitimately tiny model is
//! indistinguishable from an interrupted download here.

use super::cache::CacheLayout;
use super::size::dir_size;
use serde::{Deserialize, Serialize};

/// Entries strictly below this size are removed
pub const CLEANUP_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// Result of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub count: usize,
    pub deleted: Vec<String>,
}

/// Delete undersized cache entries
pub fn cleanup_incomplete(layout: &CacheLayout, threshold: u64) -> CleanupReport {
    let Ok(entries) = std::fs::read_dir(layout.root()) else {
        return CleanupReport::default();
    };

    let mut candidates: Vec<_> = entries
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.path())
        .collect();
    candidates.sort();

    let mut deleted = Vec::new();
    for path in candidates {
        let size = dir_size(&path);
        if size >= threshold {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::info!(entry = %name, size_bytes = size, "Removed incomplete cache entry");
                deleted.push(name);
            }
            Err(e) => {
                tracing::warn!(entry = %name, error = %e, "Failed to remove cache entry");
            }
        }
    }

    CleanupReport {
        count: deleted.len(),
        deleted,
    }
}
