//! API request and response models

use crate::error::{ManagerError, ManagerResult};
use crate::models::classify::Classification;
use crate::models::hub::HubModelSummary;
use serde::{Deserialize, Serialize};

/// Liveness response with capability flags
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub aria2: bool,
    pub cuda: bool,
}

/// Body of every single-model request
#[derive(Debug, Serialize, Deserialize)]
pub struct RepoRequest {
    pub repo_id: String,
}

impl RepoRequest {
    /// Trimmed repo ID, rejecting empty values
    pub fn repo_id(&self) -> ManagerResult<&str> {
        let repo_id = self.repo_id.trim();
        if repo_id.is_empty() {
            return Err(ManagerError::BadRequest("repo_id cannot be empty".to_string()));
        }
        Ok(repo_id)
    }
}

/// Catalog search request
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

pub fn default_search_limit() -> usize {
    10
}

/// Catalog search result
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub author: Option<String>,
    pub downloads: u64,
    /// Coarse guess from the `transformers` tag
    pub is_standard: bool,
    pub tags: Vec<String>,
    pub likes: u64,
    pub pipeline_tag: Option<String>,
}

const TRANSFORMERS_TAG: &str = "transformers";

impl From<HubModelSummary> for SearchResult {
    fn from(summary: HubModelSummary) -> Self {
        let author = summary.author_name();
        Self {
            is_standard: summary.tags.iter().any(|t| t == TRANSFORMERS_TAG),
            id: summary.id,
            author,
            downloads: summary.downloads,
            tags: summary.tags,
            likes: summary.likes,
            pipeline_tag: summary.pipeline_tag,
        }
    }
}

/// Pre-download classification
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckRemoteResponse {
    pub repo_id: String,
    pub is_standard: bool,
    pub custom_files: Vec<String>,
    pub message: String,
}

impl CheckRemoteResponse {
    pub fn new(repo_id: &str, classification: Classification) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            message: classification.difficulty_message().to_string(),
            is_standard: classification.is_standard,
            custom_files: classification.custom_files,
        }
    }
}

/// Acknowledgment of a queued download
#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub status: String,
    pub message: String,
}

impl DownloadResponse {
    pub fn queued(repo_id: &str) -> Self {
        Self {
            status: "queued".to_string(),
            message: format!("Téléchargement de {} démarré.", repo_id),
        }
    }
}

/// Result of a model deletion
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Query parameters for cleanup
#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    #[serde(rename = "type", default = "default_cleanup_type")]
    pub kind: String,
}

pub const CLEANUP_INCOMPLETE: &str = "incomplete";

fn default_cleanup_type() -> String {
    CLEANUP_INCOMPLETE.to_string()
}
