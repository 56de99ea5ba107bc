//! Model configuration descriptor (`config.json`) handling
//!
//! Two levels of reading are offered:
//! - [`probe_local_config`] / [`ConfigProbe`]: a cheap, never-failing look
//!   used by the classifier; callers choose how to treat each outcome.
//! - [`load_pretrained_config`]: a strict typed load used by verification,
//!   which also resolves any remote-code modules the config declares.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.json";

/// Outcome of looking for a configuration descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigProbe {
    /// Descriptor exists and parsed as JSON
    Found(serde_json::Value),
    /// No descriptor (missing file, or 404 remotely)
    Absent,
    /// Descriptor exists but is not valid JSON
    Invalid(String),
    /// Could not be read (I/O, network, timeout, unexpected status)
    TransientError(String),
}

impl ConfigProbe {
    /// True when the descriptor names an architecture or model type
    pub fn declares_architecture(&self) -> bool {
        match self {
            Self::Found(value) => declares_architecture(value),
            _ => false,
        }
    }
}

/// Whether a parsed config carries `architectures` or `model_type`
pub fn declares_architecture(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key("architectures") || obj.contains_key("model_type"))
}

/// Read `config.json` at the root of a snapshot
pub fn probe_local_config(snapshot: &Path) -> ConfigProbe {
    let config_path = snapshot.join(CONFIG_FILE);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ConfigProbe::Absent,
        Err(e) => return ConfigProbe::TransientError(e.to_string()),
    };

    match serde_json::from_str(&content) {
        Ok(value) => ConfigProbe::Found(value),
        Err(e) => ConfigProbe::Invalid(e.to_string()),
    }
}

/// Errors from a strict descriptor load
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("config.json not found")]
    Missing,

    #[error("Failed to read config.json: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config.json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config.json declares neither architectures nor model_type")]
    NoArchitecture,

    #[error("Remote code module not found: {0}")]
    MissingRemoteCode(String),
}

/// `auto_map` values: a class path, or a `[slow, fast]` tokenizer pair
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AutoMapTarget {
    Class(String),
    Pair(Vec<Option<String>>),
}

impl AutoMapTarget {
    fn class_paths(&self) -> Vec<&str> {
        match self {
            Self::Class(path) => vec![path.as_str()],
            Self::Pair(paths) => paths.iter().flatten().map(String::as_str).collect(),
        }
    }
}

/// Typed subset of a transformers `config.json`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PretrainedConfig {
    pub model_type: Option<String>,
    pub architectures: Option<Vec<String>>,

    /// Remote-code classes, e.g. `{"AutoModel": "modeling_acme.AcmeModel"}`
    #[serde(default)]
    pub auto_map: HashMap<String, AutoMapTarget>,
}

impl PretrainedConfig {
    /// Local source files referenced by `auto_map`, sorted and deduplicated
    ///
    /// References into other repos (`org/repo--module.Class`) are skipped.
    pub fn remote_code_modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self
            .auto_map
            .values()
            .flat_map(AutoMapTarget::class_paths)
            .filter(|path| !path.contains("--"))
            .filter_map(|path| path.rsplit_once('.').map(|(module, _)| module))
            .map(|module| format!("{}.py", module.replace('.', "/")))
            .collect();

        modules.sort();
        modules.dedup();
        modules
    }
}

/// Load a snapshot's descriptor, trusting any remote code it declares
///
/// Succeeds only when the config parses, declares an architecture or model
/// type, and every module named in `auto_map` is present in the snapshot.
pub fn load_pretrained_config(snapshot: &Path) -> Result<PretrainedConfig, MetadataError> {
    let config_path = snapshot.join(CONFIG_FILE);
    if !config_path.is_file() {
        return Err(MetadataError::Missing);
    }

    let content = std::fs::read_to_string(&config_path)?;
    let config: PretrainedConfig = serde_json::from_str(&content)?;

    if config.model_type.is_none() && config.architectures.is_none() {
        return Err(MetadataError::NoArchitecture);
    }

    for module in config.remote_code_modules() {
        if !snapshot.join(&module).is_file() {
            return Err(MetadataError::MissingRemoteCode(module));
        }
    }

    Ok(config)
}
