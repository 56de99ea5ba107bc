//! Standard vs custom model classification
//!
//! A model is *standard* when its `config.json` declares `architectures`
//! or `model_type`, i.e. a generic auto-loader can build it. Independently,
//! any root-level Python source file marks it as shipping *custom* code.
//! Both facts are reported together: a standard architecture may still
//! need `trust_remote_code`.

use super::hub::HubClient;
use super::metadata::probe_local_config;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root-level files that are never model code
pub const NON_MODEL_SCRIPTS: [&str; 2] = ["requirements.txt", "setup.py"];

const SOURCE_EXTENSION: &str = ".py";

pub const MESSAGE_STANDARD: &str = "Standard HF (Facile)";
pub const MESSAGE_CUSTOM: &str = "Custom/Complexe (Attention)";

/// Classification verdict for a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_standard: bool,
    pub custom_files: Vec<String>,
}

impl Classification {
    pub fn has_custom_code(&self) -> bool {
        !self.custom_files.is_empty()
    }

    /// Human-readable difficulty shown before download
    pub fn difficulty_message(&self) -> &'static str {
        if self.is_standard && !self.has_custom_code() {
            MESSAGE_STANDARD
        } else {
            MESSAGE_CUSTOM
        }
    }
}

/// Whether a repo-relative path is root-level model source code
pub fn is_custom_source(path: &str) -> bool {
    !path.contains('/')
        && path.ends_with(SOURCE_EXTENSION)
        && !NON_MODEL_SCRIPTS.contains(&path)
}

/// Classify a downloaded snapshot
///
/// A missing or malformed `config.json` simply yields `is_standard = false`.
pub fn classify_local(snapshot: &Path) -> Classification {
    let probe = probe_local_config(snapshot);
    tracing::trace!(snapshot = ?snapshot, probe = ?probe, "Probed local config");

    let mut custom_files: Vec<String> = std::fs::read_dir(snapshot)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|name| is_custom_source(name))
                .collect()
        })
        .unwrap_or_default();
    custom_files.sort();

    Classification {
        is_standard: probe.declares_architecture(),
        custom_files,
    }
}

/// Classify a model that may not be downloaded yet
///
/// The config probe and the file listing run concurrently and degrade
/// independently: a failed probe means not standard, a failed listing
/// means no custom files.
pub async fn classify_remote(hub: &dyn HubClient, repo_id: &str) -> Classification {
    let (probe, files) = tokio::join!(hub.fetch_config(repo_id), hub.list_files(repo_id));

    let custom_files = match files {
        Ok(files) => files.into_iter().filter(|f| is_custom_source(f)).collect(),
        Err(e) => {
            tracing::warn!(repo_id = %repo_id, error = %e, "Failed to list remote files");
            Vec::new()
        }
    };

    Classification {
        is_standard: probe.declares_architecture(),
        custom_files,
    }
}
