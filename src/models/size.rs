//! Directory sizing and completeness heuristics
//!
//! Sizes are best-effort: traversal errors (permissions, dangling
//! symlinks) are skipped rather than reported. No content hashing happens
//! here; "complete" only means "large enough to have finished".

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;

/// Snapshots at or above this size are considered fully downloaded
pub const COMPLETE_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

const UNITS: [&str; 8] = ["", "K", "M", "G", "T", "P", "E", "Z"];

/// Split a byte count into a magnitude and binary unit prefix
///
/// The magnitude is below 1024 for every unit except the terminal `Y`.
pub fn size_parts(bytes: u64) -> (f64, &'static str) {
    let mut num = bytes as f64;
    for unit in UNITS {
        if num.abs() < 1024.0 {
            return (num, unit);
        }
        num /= 1024.0;
    }
    (num, "Y")
}

/// Human-readable size, e.g. `512.0B`, `1.5KB`, `10.0MB`
pub fn size_fmt(bytes: u64) -> String {
    match size_parts(bytes) {
        (num, "Y") => format!("{:.1}YB", num),
        (num, unit) => format!("{:3.1}{}B", num, unit),
    }
}

/// Size of a directory tree with its formatted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    pub bytes: u64,
    pub formatted: String,
}

impl SizeReport {
    pub fn measure(path: &Path) -> Self {
        let bytes = dir_size(path);
        Self {
            bytes,
            formatted: size_fmt(bytes),
        }
    }
}

/// Acquisition-progress verdict derived from snapshot size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    #[serde(rename = "Complet")]
    Complete,
    #[serde(rename = "Incomplet")]
    Incomplete,
}

impl Completeness {
    pub fn from_size(bytes: u64, threshold: u64) -> Self {
        if bytes >= threshold {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }
}

impl std::fmt::Display for Completeness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "Complet"),
            Self::Incomplete => write!(f, "Incomplet"),
        }
    }
}

/// Recursively calculate directory size
///
/// Symlinked files count with their target's size (HF snapshots link
/// into `blobs/`); symlinked directories are not followed.
pub fn dir_size(path: &Path) -> u64 {
    let mut size = 0;
    visit_files(path, &mut |_, metadata| size += metadata.len());
    size
}

/// Count regular files below `path` whose extension is in `extensions`
pub fn count_files_with_extension(path: &Path, extensions: &[&str]) -> usize {
    let mut count = 0;
    visit_files(path, &mut |file, _| {
        let matches = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if matches {
            count += 1;
        }
    });
    count
}

/// Walk a tree and call `f` for every regular file (or link to one)
pub(crate) fn visit_files(path: &Path, f: &mut dyn FnMut(&Path, &Metadata)) {
    let Ok(entries) = std::fs::read_dir(path) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let entry_path = entry.path();

        if file_type.is_dir() {
            visit_files(&entry_path, f);
        } else if let Ok(metadata) = std::fs::metadata(&entry_path)
            && metadata.is_file()
        {
            f(&entry_path, &metadata);
        }
    }
}
