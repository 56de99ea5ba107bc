//! Inventory of locally cached models

use super::cache::{CacheEntry, CacheLayout, latest_snapshot};
use super::classify::classify_local;
use super::size::{Completeness, SizeReport, count_files_with_extension};
use serde::{Deserialize, Serialize};

const PYTORCH_EXTENSIONS: &[&str] = &["bin", "safetensors"];
const TENSORFLOW_EXTENSIONS: &[&str] = &["h5"];

/// Source kind reported for hub cache entries
pub const KIND_HUGGINGFACE: &str = "HuggingFace";

/// One cached model with its derived fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedModel {
    /// Cache directory name
    pub nom: String,
    pub repo_id: String,
    /// Path of the inspected snapshot
    pub chemin: String,
    pub taille_fmt: String,
    pub taille_bytes: u64,
    pub statut: Completeness,
    #[serde(rename = "type")]
    pub kind: String,
    pub pytorch: bool,
    pub tf: bool,
    pub cuda_compatible: bool,
    pub standard_hf: bool,
    pub custom_files: Vec<String>,
}

/// Options that do not come from the filesystem
#[derive(Debug, Clone, Copy)]
pub struct ListingOptions {
    pub complete_threshold_bytes: u64,
    pub cuda_available: bool,
}

fn describe(entry: CacheEntry, options: ListingOptions) -> Option<CachedModel> {
    let Some(snapshot) = latest_snapshot(&entry.path) else {
        tracing::debug!(entry = %entry.name, "Skipping cache entry without snapshots");
        return None;
    };

    let size = SizeReport::measure(&snapshot);
    let classification = classify_local(&snapshot);

    Some(CachedModel {
        nom: entry.name,
        repo_id: entry.repo_id,
        chemin: snapshot.to_string_lossy().to_string(),
        taille_fmt: size.formatted,
        taille_bytes: size.bytes,
        statut: Completeness::from_size(size.bytes, options.complete_threshold_bytes),
        kind: KIND_HUGGINGFACE.to_string(),
        pytorch: count_files_with_extension(&snapshot, PYTORCH_EXTENSIONS) > 0,
        tf: count_files_with_extension(&snapshot, TENSORFLOW_EXTENSIONS) > 0,
        cuda_compatible: options.cuda_available,
        standard_hf: classification.is_standard,
        custom_files: classification.custom_files,
    })
}

/// List every `models--*` entry that has at least one snapshot, sorted by name
///
/// Blocking: walks every snapshot to size it.
pub fn list_cached_models(layout: &CacheLayout, options: ListingOptions) -> Vec<CachedModel> {
    layout
        .entries()
        .into_iter()
        .filter_map(|entry| describe(entry, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::size::COMPLETE_THRESHOLD_BYTES;
    use tempfile::TempDir;

    const OPTIONS: ListingOptions = ListingOptions {
        complete_threshold_bytes: COMPLETE_THRESHOLD_BYTES,
        cuda_available: false,
    };

    #[test]
    fn test_lists_models_with_derived_fields() {
        let dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(dir.path());
        let snap = layout.snapshot_dir("org/model", "abc");
        std::fs::create_dir_all(snap.join("onnx")).unwrap();
        std::fs::write(snap.join("config.json"), r#"{"model_type": "bert"}"#).unwrap();
        std::fs::write(snap.join("onnx/model.safetensors"), vec![0u8; 2048]).unwrap();
        std::fs::write(snap.join("tf_model.h5"), "x").unwrap();

        let models = list_cached_models(&layout, OPTIONS);

        assert_eq!(models.len(), 1);
        let model = &models[0];
        assert_eq!(model.nom, "models--org--model");
        assert_eq!(model.repo_id, "org/model");
        assert_eq!(model.chemin, snap.to_string_lossy());
        assert_eq!(model.statut, Completeness::Incomplete);
        assert_eq!(model.kind, KIND_HUGGINGFACE);
        assert!(model.pytorch);
        assert!(model.tf);
        assert!(model.standard_hf);
        assert!(model.custom_files.is_empty());
    }

    #[test]
    fn test_skips_entries_without_snapshots() {
        let dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(dir.path());
        std::fs::create_dir_all(layout.snapshots_dir("org/empty")).unwrap();
        std::fs::create_dir_all(layout.model_dir("org/bare")).unwrap();
        std::fs::create_dir_all(dir.path().join("datasets--org--data/snapshots/abc")).unwrap();

        assert!(list_cached_models(&layout, OPTIONS).is_empty());
    }

    #[test]
    fn test_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(dir.path());
        for id in ["zeta/model", "alpha/model", "mid/model"] {
            std::fs::create_dir_all(layout.snapshot_dir(id, "abc")).unwrap();
        }

        let names: Vec<_> = list_cached_models(&layout, OPTIONS)
            .into_iter()
            .map(|m| m.repo_id)
            .collect();
        assert_eq!(names, vec!["alpha/model", "mid/model", "zeta/model"]);
    }

    #[test]
    fn test_wire_field_names() {
        let dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(dir.path());
        std::fs::create_dir_all(layout.snapshot_dir("org/model", "abc")).unwrap();

        let models = list_cached_models(
            &layout,
            ListingOptions {
                cuda_available: true,
                ..OPTIONS
            },
        );
        let json = serde_json::to_value(&models[0]).unwrap();

        assert_eq!(json["type"], "HuggingFace");
        assert_eq!(json["statut"], "Incomplet");
        assert_eq!(json["cuda_compatible"], true);
        assert_eq!(json["taille_fmt"], "0.0B");
    }
}
