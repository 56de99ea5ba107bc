//! Remote model hub access
//!
//! The hub is consumed through the [`HubClient`] trait so the classifier,
//! acquisition engine and API handlers can be exercised against an
//! in-memory hub in tests. [`HfHubClient`] is the production client: repo
//! metadata goes through `hf-hub`, search and the config probe through
//! `reqwest` (hf-hub has no listing API).

use super::metadata::{CONFIG_FILE, ConfigProbe};
use crate::config::ManagerConfig;
use async_trait::async_trait;
use hf_hub::api::tokio::{Api, ApiBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors talking to the remote hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Hub request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Hub API error: {0}")]
    Api(#[from] hf_hub::api::tokio::ApiError),

    #[error("Hub returned status {status} for {url}")]
    Status { status: u16, url: String },
}

/// One entry of a catalog search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubModelSummary {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pipeline_tag: Option<String>,
}

impl HubModelSummary {
    /// Author field, falling back to the namespace of the repo ID
    pub fn author_name(&self) -> Option<String> {
        self.author.clone().or_else(|| {
            self.id
                .split_once('/')
                .map(|(namespace, _)| namespace.to_string())
        })
    }
}

/// Commit and file listing of a remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub sha: String,
    pub files: Vec<String>,
}

/// Capabilities required from the remote hub
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Search the catalog, most downloaded first
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<HubModelSummary>, HubError>;

    /// Commit of the default branch plus every file path in the repo
    async fn repo_info(&self, repo_id: &str) -> Result<RemoteRepo, HubError>;

    /// Fetch the remote `config.json` (short timeout, never fails)
    async fn fetch_config(&self, repo_id: &str) -> ConfigProbe;

    async fn list_files(&self, repo_id: &str) -> Result<Vec<String>, HubError> {
        Ok(self.repo_info(repo_id).await?.files)
    }

    async fn get_commit(&self, repo_id: &str) -> Result<String, HubError> {
        Ok(self.repo_info(repo_id).await?.sha)
    }
}

/// Raw-content URL of a file at a revision
///
/// e.g. `https://huggingface.co/org/model/resolve/main/config.json`
pub fn resolve_url(endpoint: &str, repo_id: &str, revision: &str, path: &str) -> String {
    format!(
        "{}/{}/resolve/{}/{}",
        endpoint.trim_end_matches('/'),
        repo_id,
        revision,
        path
    )
}

/// Production hub client
pub struct HfHubClient {
    api: Api,
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    probe_timeout: Duration,
}

impl HfHubClient {
    pub fn new(config: &ManagerConfig) -> Result<Self, HubError> {
        let api = ApiBuilder::new()
            .with_endpoint(config.endpoint().to_string())
            .with_cache_dir(config.cache_dir.clone())
            .with_token(config.hf_token.clone())
            .with_progress(false)
            .build()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("hub-cache-manager/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api,
            http,
            endpoint: config.endpoint().to_string(),
            token: config.hf_token.clone(),
            probe_timeout: Duration::from_secs(config.remote_probe_timeout_secs),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl HubClient for HfHubClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<HubModelSummary>, HubError> {
        let url = format!("{}/api/models", self.endpoint);
        let limit = limit.to_string();

        tracing::debug!(query = %query, limit = %limit, "Searching hub");

        let response = self
            .authorized(self.http.get(&url))
            .query(&[
                ("search", query),
                ("sort", "downloads"),
                ("direction", "-1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HubError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    async fn repo_info(&self, repo_id: &str) -> Result<RemoteRepo, HubError> {
        let info = self.api.model(repo_id.to_string()).info().await?;

        Ok(RemoteRepo {
            sha: info.sha,
            files: info.siblings.into_iter().map(|s| s.rfilename).collect(),
        })
    }

    async fn fetch_config(&self, repo_id: &str) -> ConfigProbe {
        let url = resolve_url(&self.endpoint, repo_id, "main", CONFIG_FILE);

        let response = match self
            .authorized(self.http.get(&url))
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(repo_id = %repo_id, error = %e, "Remote config probe failed");
                return ConfigProbe::TransientError(e.to_string());
            }
        };

        match response.status() {
            reqwest::StatusCode::OK => match response.json::<serde_json::Value>().await {
                Ok(value) => ConfigProbe::Found(value),
                Err(e) => ConfigProbe::Invalid(e.to_string()),
            },
            reqwest::StatusCode::NOT_FOUND => ConfigProbe::Absent,
            status => ConfigProbe::TransientError(format!("unexpected status {}", status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://huggingface.co/", "org/model", "main", "config.json"),
            "https://huggingface.co/org/model/resolve/main/config.json"
        );
        assert_eq!(
            resolve_url("http://localhost:8080", "org/model", "abc123", "onnx/model.onnx"),
            "http://localhost:8080/org/model/resolve/abc123/onnx/model.onnx"
        );
    }

    #[test]
    fn test_summary_deserialize_partial() {
        let json = r#"[
            {"id": "acme/bert-base", "downloads": 42, "tags": ["transformers", "bert"]},
            {"id": "solo-model", "likes": 3, "pipeline_tag": "fill-mask"}
        ]"#;
        let results: Vec<HubModelSummary> = serde_json::from_str(json).unwrap();

        assert_eq!(results[0].downloads, 42);
        assert_eq!(results[0].likes, 0);
        assert_eq!(results[0].author_name().as_deref(), Some("acme"));
        assert!(results[1].tags.is_empty());
        assert_eq!(results[1].author_name(), None);
        assert_eq!(results[1].pipeline_tag.as_deref(), Some("fill-mask"));
    }

    #[test]
    fn test_client_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(HfHubClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_config_unreachable_is_transient() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            // Nothing listens on port 9 locally
            hub_endpoint: "http://127.0.0.1:9".to_string(),
            remote_probe_timeout_secs: 1,
            ..Default::default()
        };
        let client = HfHubClient::new(&config).unwrap();

        let probe = client.fetch_config("acme/bert-base").await;
        assert!(matches!(probe, ConfigProbe::TransientError(_)));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_repo_info_real_model() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let client = HfHubClient::new(&config).unwrap();
        let repo = client.repo_info("TaylorAI/gte-tiny").await.unwrap();
        assert!(!repo.sha.is_empty());
        assert!(repo.files.iter().any(|f| f == "config.json"));
    }
}
