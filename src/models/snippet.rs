//! Example loading code for a model
//!
//! Standard models get an auto-loader snippet (with `trust_remote_code`
//! when the repo ships source files); custom models get a stub that must
//! be completed by hand.

use super::cache::CacheLayout;
use super::classify::{Classification, classify_local, classify_remote};
use super::hub::HubClient;
use serde::{Deserialize, Serialize};

pub const DESCRIPTION_STANDARD: &str = "Code Standard Hugging Face (Transformers)";
pub const DESCRIPTION_CUSTOM: &str = "Modèle Custom (Nécessite code spécifique)";

/// Generated snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub code: String,
    pub description: String,
    pub is_standard: bool,
}

/// Build the snippet for a repo, preferring the local snapshot
///
/// - snapshot present: its path and local classification
/// - `snapshots/` present but empty: the repo ID, assumed standard
/// - not downloaded: the repo ID and remote classification
pub async fn snippet_for(layout: &CacheLayout, hub: &dyn HubClient, repo_id: &str) -> Snippet {
    if let Some(snapshot) = layout.latest_snapshot(repo_id) {
        let classification = classify_local(&snapshot);
        return render_snippet(&snapshot.to_string_lossy(), &classification);
    }

    if layout.snapshots_dir(repo_id).is_dir() {
        let classification = Classification {
            is_standard: true,
            custom_files: Vec::new(),
        };
        return render_snippet(repo_id, &classification);
    }

    let classification = classify_remote(hub, repo_id).await;
    render_snippet(repo_id, &classification)
}

/// Render the snippet for a model reference (local path or repo ID)
pub fn render_snippet(model_ref: &str, classification: &Classification) -> Snippet {
    if classification.is_standard {
        Snippet {
            code: standard_code(model_ref, classification.has_custom_code()),
            description: DESCRIPTION_STANDARD.to_string(),
            is_standard: true,
        }
    } else {
        Snippet {
            code: custom_code(model_ref, &classification.custom_files),
            description: DESCRIPTION_CUSTOM.to_string(),
            is_standard: false,
        }
    }
}

/// Render `value` as a double-quoted Python string literal
fn python_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn standard_code(model_ref: &str, trust_remote_code: bool) -> String {
    format!(
        r#"from transformers import AutoModel, AutoTokenizer

model_id = {model_ref}

model = AutoModel.from_pretrained(model_id, trust_remote_code={trust})
tokenizer = AutoTokenizer.from_pretrained(model_id)

print("Model loaded")"#,
        model_ref = python_str(model_ref),
        trust = python_bool(trust_remote_code),
    )
}

fn custom_code(model_ref: &str, custom_files: &[String]) -> String {
    let sources = if custom_files.is_empty() {
        "# No Python sources were found at the repository root.".to_string()
    } else {
        format!("# Source files shipped with the model: {}", custom_files.join(", "))
    };
    let model_ref = python_str(model_ref);

    format!(
        r#"import sys
from pathlib import Path

import torch

model_path = Path({model_ref})
sys.path.append(str(model_path))

{sources}
# Import the entry point class and load the weights by hand, e.g.:
# from modeling_custom import CustomModel
# model = CustomModel.load(model_path)

print("This model requires a manual loading implementation.")"#
    )
}
