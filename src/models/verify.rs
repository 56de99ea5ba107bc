//! Usability check for cached models
//!
//! Standard models are verified by loading their descriptor (remote code
//! modules included). Anything else, or a standard model whose descriptor
//! fails to load, is judged by the presence of weight files. Every outcome
//! is a report, never an error.

use super::cache::CacheLayout;
use super::classify::classify_local;
use super::metadata::load_pretrained_config;
use super::size::count_files_with_extension;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extensions of files that carry model weights
pub const WEIGHT_EXTENSIONS: &[&str] = &["safetensors", "bin"];

/// Verification verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NotInstalled,
    NoSnapshot,
    ValidConfig,
    Weights(usize),
    NoWeights,
}

impl Verdict {
    pub fn is_functional(&self) -> bool {
        matches!(self, Self::ValidConfig | Self::Weights(_))
    }

    pub fn details(&self) -> String {
        match self {
            Self::NotInstalled => "Non installé".to_string(),
            Self::NoSnapshot => "Aucun snapshot".to_string(),
            Self::ValidConfig => "Configuration valide".to_string(),
            Self::Weights(count) => format!("{} fichiers de poids trouvés", count),
            Self::NoWeights => "Aucun poids détecté".to_string(),
        }
    }
}

/// Wire form of a verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub repo_id: String,
    #[serde(rename = "fonctionnel")]
    pub functional: bool,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Verification engine
#[derive(Debug, Clone)]
pub struct Verifier {
    layout: CacheLayout,
    load_config: bool,
}

impl Verifier {
    pub fn new(layout: CacheLayout) -> Self {
        Self {
            layout,
            load_config: true,
        }
    }

    /// Enable or disable descriptor loading for standard models
    pub fn with_config_loading(mut self, enabled: bool) -> Self {
        self.load_config = enabled;
        self
    }

    pub fn verify(&self, repo_id: &str) -> VerifyReport {
        let (verdict, path) = self.evaluate(repo_id);

        tracing::debug!(
            repo_id = %repo_id,
            verdict = ?verdict,
            "Verified model"
        );

        VerifyReport {
            repo_id: repo_id.to_string(),
            functional: verdict.is_functional(),
            details: verdict.details(),
            path: path.filter(|_| verdict.is_functional()),
        }
    }

    fn evaluate(&self, repo_id: &str) -> (Verdict, Option<PathBuf>) {
        if !self.layout.snapshots_dir(repo_id).is_dir() {
            return (Verdict::NotInstalled, None);
        }

        let Some(snapshot) = self.layout.latest_snapshot(repo_id) else {
            return (Verdict::NoSnapshot, None);
        };

        if self.load_config && classify_local(&snapshot).is_standard {
            match load_pretrained_config(&snapshot) {
                Ok(_) => return (Verdict::ValidConfig, Some(snapshot)),
                Err(e) => {
                    tracing::info!(
                        repo_id = %repo_id,
                        error = %e,
                        "Config load failed, checking weights instead"
                    );
                }
            }
        }

        let weights = count_files_with_extension(&snapshot, WEIGHT_EXTENSIONS);
        if weights > 0 {
            (Verdict::Weights(weights), Some(snapshot))
        } else {
            (Verdict::NoWeights, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot(dir: &TempDir, repo_id: &str) -> PathBuf {
        let path = CacheLayout::new(dir.path()).snapshot_dir(repo_id, "abc123");
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_not_installed() {
        let dir = TempDir::new().unwrap();
        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/missing");

        assert!(!report.functional);
        assert_eq!(report.details, "Non installé");
        assert!(report.path.is_none());
    }

    #[test]
    fn test_empty_snapshots_dir() {
        let dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(dir.path());
        std::fs::create_dir_all(layout.snapshots_dir("org/model")).unwrap();

        let report = Verifier::new(layout).verify("org/model");
        assert!(!report.functional);
        assert_eq!(report.details, "Aucun snapshot");
    }

    #[test]
    fn test_weights_without_config() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::write(snap.join("model.safetensors"), "weights").unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/model");
        assert!(report.functional);
        assert_eq!(report.details, "1 fichiers de poids trouvés");
        assert_eq!(report.path, Some(snap));
    }

    #[test]
    fn test_standard_config_is_valid() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::write(snap.join("config.json"), r#"{"model_type": "bert"}"#).unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/model");
        assert!(report.functional);
        assert_eq!(report.details, "Configuration valide");
    }

    #[test]
    fn test_config_loading_disabled_checks_weights() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::write(snap.join("config.json"), r#"{"model_type": "bert"}"#).unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path()))
            .with_config_loading(false)
            .verify("org/model");
        assert!(!report.functional);
        assert_eq!(report.details, "Aucun poids détecté");
    }

    #[test]
    fn test_broken_remote_code_falls_back_to_weights() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::write(
            snap.join("config.json"),
            r#"{"architectures": ["AcmeModel"], "auto_map": {"AutoModel": "modeling_acme.AcmeModel"}}"#,
        )
        .unwrap();
        std::fs::write(snap.join("pytorch_model.bin"), "weights").unwrap();
        std::fs::write(snap.join("model.safetensors"), "weights").unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/model");
        assert!(report.functional);
        assert_eq!(report.details, "2 fichiers de poids trouvés");
    }

    #[test]
    fn test_only_pytorch_weights_are_counted() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::create_dir_all(snap.join("onnx")).unwrap();
        std::fs::write(snap.join("model.safetensors"), "weights").unwrap();
        std::fs::write(snap.join("tf_model.h5"), "weights").unwrap();
        std::fs::write(snap.join("flax_model.msgpack"), "weights").unwrap();
        std::fs::write(snap.join("onnx").join("model.onnx"), "weights").unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/model");
        assert!(report.functional);
        assert_eq!(report.details, "1 fichiers de poids trouvés");
    }

    #[test]
    fn test_gguf_only_is_not_functional() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::write(snap.join("model-q4.gguf"), "weights").unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/model");
        assert!(!report.functional);
        assert_eq!(report.details, "Aucun poids détecté");
        assert!(report.path.is_none());
    }

    #[test]
    fn test_no_weights() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(&dir, "org/model");
        std::fs::write(snap.join("README.md"), "hello").unwrap();

        let report = Verifier::new(CacheLayout::new(dir.path())).verify("org/model");
        assert!(!report.functional);
        assert_eq!(report.details, "Aucun poids détecté");
    }

    #[test]
    fn test_report_serialization() {
        let report = VerifyReport {
            repo_id: "org/model".to_string(),
            functional: false,
            details: "Non installé".to_string(),
            path: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fonctionnel"], false);
        assert!(json.get("path").is_none());
    }
}
