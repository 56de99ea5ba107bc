//! HuggingFace cache layout utilities
//!
//! Resolves model IDs to cache directories and picks the snapshot to
//! inspect. Cache structure:
//! ```text
//! ~/.cache/huggingface/hub/
//! ├── models--BAAI--bge-small-en-v1.5/
//! │   ├── snapshots/
//! │   │   └── {revision}/
//! │   │       ├── config.json
//! │   │       ├── model.safetensors
//! │   │       └── tokenizer.json
//! │   └── refs/
//! │       └── main
//! └── models--sentence-transformers--all-MiniLM-L6-v2/
//!     └── ...
//! ```
//!
//! Nothing here is cached in memory: every call re-reads the filesystem.

use std::path::{Path, PathBuf};

/// Directory name prefix for model repositories
pub const MODEL_PREFIX: &str = "models--";

/// Replaces `/` in repo IDs
const SEPARATOR_TOKEN: &str = "--";

/// Get the HuggingFace cache directory
///
/// Checks in order:
/// 1. `$HF_HUB_CACHE`
/// 2. `$HF_HOME/hub`
/// 3. `$XDG_CACHE_HOME/huggingface/hub`
/// 4. `~/.cache/huggingface/hub`
pub fn default_cache_dir() -> PathBuf {
    if let Ok(hub_cache) = std::env::var("HF_HUB_CACHE") {
        return PathBuf::from(hub_cache);
    }

    if let Ok(hf_home) = std::env::var("HF_HOME") {
        return PathBuf::from(hf_home).join("hub");
    }

    if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg_cache).join("huggingface/hub");
    }

    dirs::home_dir()
        .map(|h| h.join(".cache/huggingface/hub"))
        .unwrap_or_else(|| PathBuf::from("/tmp/huggingface/hub"))
}

/// Convert model ID to cache directory name
///
/// e.g., "BAAI/bge-small-en-v1.5" -> "models--BAAI--bge-small-en-v1.5"
pub fn model_id_to_cache_name(model_id: &str) -> String {
    format!("{}{}", MODEL_PREFIX, model_id.replace('/', SEPARATOR_TOKEN))
}

/// Convert cache directory name back to model ID
///
/// Only the first separator is restored, so names containing `--` survive
/// as long as the namespace does not.
pub fn cache_name_to_model_id(cache_name: &str) -> Option<String> {
    cache_name
        .strip_prefix(MODEL_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(|s| s.replacen(SEPARATOR_TOKEN, "/", 1))
}

/// A `models--*` directory found under the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Directory name, e.g. `models--BAAI--bge-small-en-v1.5`
    pub name: String,
    pub repo_id: String,
    pub path: PathBuf,
}

/// Path arithmetic over one cache root
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_dir(&self, model_id: &str) -> PathBuf {
        self.root.join(model_id_to_cache_name(model_id))
    }

    pub fn snapshots_dir(&self, model_id: &str) -> PathBuf {
        self.model_dir(model_id).join("snapshots")
    }

    pub fn snapshot_dir(&self, model_id: &str, commit: &str) -> PathBuf {
        self.snapshots_dir(model_id).join(commit)
    }

    pub fn refs_dir(&self, model_id: &str) -> PathBuf {
        self.model_dir(model_id).join("refs")
    }

    /// Whether any cache entry exists for the model
    pub fn is_cached(&self, model_id: &str) -> bool {
        self.model_dir(model_id).is_dir()
    }

    /// Most recently modified snapshot of a model, if any
    pub fn latest_snapshot(&self, model_id: &str) -> Option<PathBuf> {
        latest_snapshot(&self.model_dir(model_id))
    }

    /// Read the commit a named ref points to
    pub fn read_ref(&self, model_id: &str, name: &str) -> Option<String> {
        std::fs::read_to_string(self.refs_dir(model_id).join(name))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Delete a model's whole cache entry
    ///
    /// Returns `Ok(false)` when there was nothing to delete.
    pub fn remove_model(&self, model_id: &str) -> std::io::Result<bool> {
        let dir = self.model_dir(model_id);
        if !dir.is_dir() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    /// List model entries under the cache root, sorted by directory name
    pub fn entries(&self) -> Vec<CacheEntry> {
        let Ok(dir) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut entries: Vec<CacheEntry> = dir
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                let repo_id = cache_name_to_model_id(&name)?;
                Some(CacheEntry {
                    name,
                    repo_id,
                    path: e.path(),
                })
            })
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

/// Pick the snapshot with the newest modification time
///
/// Returns `None` when `snapshots/` is missing or holds no directories.
/// Ties on identical timestamps resolve by directory iteration order.
pub fn latest_snapshot(model_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(model_dir.join("snapshots")).ok()?;

    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let modified = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}
