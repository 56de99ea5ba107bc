//! Model acquisition
//!
//! Downloads a full repository snapshot into the HF cache layout. When the
//! multi-connection tool (aria2c) is installed, every file is fetched with
//! it into `snapshots/<commit>/` and `refs/main` is written afterwards.
//! Otherwise the whole job is handed to the hf-hub snapshot downloader,
//! which manages its own layout and refs.
//!
//! Jobs run in the background. [`DownloadManager::spawn`] returns a
//! [`DownloadHandle`] that callers may drop; failures are only logged and
//! show up later as an incomplete cache entry.

use super::cache::CacheLayout;
use super::hub::{HubClient, HubError, resolve_url};
use crate::config::ManagerConfig;
use async_trait::async_trait;
use dashmap::DashMap;
use hf_hub::api::tokio::{Api, ApiBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors that abort an acquisition job
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed on {file} ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        file: String,
        status: String,
        stderr: String,
    },

    #[error("Refusing unsafe remote path: {0}")]
    UnsafePath(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Download task aborted: {0}")]
    Aborted(String),
}

// ============================================================================
// Accelerated (per-file) downloader
// ============================================================================

/// One file transfer for the accelerated downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFetch {
    pub url: String,
    /// Directory the file is written into
    pub dir: PathBuf,
    pub file_name: String,
    pub token: Option<String>,
}

/// Fetches single files, typically by driving an external tool
#[async_trait]
pub trait AcceleratedDownloader: Send + Sync {
    /// Download one file, aborting promptly when `cancel` fires
    async fn fetch(
        &self,
        request: &FileFetch,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError>;
}

/// aria2c-backed downloader (resumable, multi-connection)
#[derive(Debug, Clone)]
pub struct Aria2Downloader {
    binary: PathBuf,
    connections: u32,
    chunk_size: String,
}

impl Aria2Downloader {
    pub fn new(binary: PathBuf, connections: u32, chunk_size: String) -> Self {
        Self {
            binary,
            connections,
            chunk_size,
        }
    }

    /// Locate the configured tool on the host, if installed
    pub fn detect(config: &ManagerConfig) -> Option<Self> {
        match which::which(&config.accelerated_tool) {
            Ok(binary) => {
                tracing::info!(binary = ?binary, "Accelerated download tool found");
                Some(Self::new(
                    binary,
                    config.download_connections,
                    config.download_chunk_size.clone(),
                ))
            }
            Err(e) => {
                tracing::info!(
                    tool = %config.accelerated_tool,
                    error = %e,
                    "Accelerated download tool not available, using hf-hub downloads"
                );
                None
            }
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Command-line arguments for one transfer
    pub fn args(&self, request: &FileFetch) -> Vec<String> {
        let mut args = vec![
            format!("-x{}", self.connections),
            format!("-s{}", self.connections),
            format!("-k{}", self.chunk_size),
            "-c".to_string(),
            "-d".to_string(),
            request.dir.to_string_lossy().to_string(),
            "-o".to_string(),
            request.file_name.clone(),
            request.url.clone(),
        ];

        if let Some(token) = &request.token {
            args.push(format!("--header=Authorization: Bearer {}", token));
        }

        args
    }
}

#[async_trait]
impl AcceleratedDownloader for Aria2Downloader {
    async fn fetch(
        &self,
        request: &FileFetch,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let child = Command::new(&self.binary)
            .args(self.args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on cancellation kills the child
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        };

        if output.status.success() {
            return Ok(());
        }

        Err(DownloadError::ToolFailed {
            tool: self.binary.to_string_lossy().to_string(),
            file: request.file_name.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

// ============================================================================
// Fallback (whole-snapshot) downloader
// ============================================================================

/// Downloads an entire snapshot with its own layout, retry and refs handling
#[async_trait]
pub trait FallbackDownloader: Send + Sync {
    /// Returns the snapshot directory
    async fn download_snapshot(&self, repo_id: &str) -> Result<PathBuf, DownloadError>;
}

/// hf-hub based snapshot download into the shared cache root
pub struct HfHubSnapshotDownloader {
    api: Api,
    layout: CacheLayout,
}

impl HfHubSnapshotDownloader {
    pub fn new(config: &ManagerConfig) -> Result<Self, HubError> {
        let api = ApiBuilder::new()
            .with_endpoint(config.endpoint().to_string())
            .with_cache_dir(config.cache_dir.clone())
            .with_token(config.hf_token.clone())
            .with_progress(false)
            .build()?;

        Ok(Self {
            api,
            layout: CacheLayout::new(config.cache_dir.clone()),
        })
    }
}

#[async_trait]
impl FallbackDownloader for HfHubSnapshotDownloader {
    async fn download_snapshot(&self, repo_id: &str) -> Result<PathBuf, DownloadError> {
        let repo = self.api.model(repo_id.to_string());
        let info = repo.info().await.map_err(HubError::from)?;

        tracing::info!(
            repo_id = %repo_id,
            revision = %info.sha,
            file_count = info.siblings.len(),
            "Downloading snapshot via hf-hub"
        );

        for sibling in &info.siblings {
            tracing::debug!(repo_id = %repo_id, file = %sibling.rfilename, "Downloading file");
            repo.get(&sibling.rfilename).await.map_err(HubError::from)?;
        }

        Ok(self.layout.snapshot_dir(repo_id, &info.sha))
    }
}

// ============================================================================
// Acquisition engine
// ============================================================================

/// Which acquisition path produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionPath {
    Accelerated,
    Fallback,
}

impl AcquisitionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Fallback => "fallback",
        }
    }
}

/// Result of a finished acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub repo_id: String,
    pub path: AcquisitionPath,
    pub snapshot: PathBuf,
    /// Files fetched by this process (0 when hf-hub handled the job)
    pub files: usize,
}

/// Handle to a background acquisition
///
/// Dropping it detaches the job; it keeps running to completion.
pub struct DownloadHandle {
    pub repo_id: String,
    cancel: CancellationToken,
    task: JoinHandle<Result<DownloadOutcome, DownloadError>>,
}

impl DownloadHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> Result<DownloadOutcome, DownloadError> {
        self.task
            .await
            .map_err(|e| DownloadError::Aborted(e.to_string()))?
    }
}

/// Orchestrates downloads into the cache
pub struct DownloadManager {
    layout: CacheLayout,
    hub: Arc<dyn HubClient>,
    accelerated: Option<Arc<dyn AcceleratedDownloader>>,
    fallback: Arc<dyn FallbackDownloader>,
    endpoint: String,
    token: Option<String>,
    /// Serialises acquisitions of the same repo
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Parent of every job token; cancelled on shutdown
    shutdown: CancellationToken,
}

impl DownloadManager {
    pub fn new(
        layout: CacheLayout,
        hub: Arc<dyn HubClient>,
        accelerated: Option<Arc<dyn AcceleratedDownloader>>,
        fallback: Arc<dyn FallbackDownloader>,
        endpoint: String,
        token: Option<String>,
    ) -> Self {
        Self {
            layout,
            hub,
            accelerated,
            fallback,
            endpoint,
            token,
            locks: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Whether per-file accelerated downloads are enabled
    pub fn has_accelerated(&self) -> bool {
        self.accelerated.is_some()
    }

    /// Queue a background acquisition
    pub fn spawn(self: &Arc<Self>, repo_id: String) -> DownloadHandle {
        let cancel = self.shutdown.child_token();
        let manager = Arc::clone(self);
        let job_cancel = cancel.clone();
        let job_repo = repo_id.clone();

        crate::metrics::record_download_queued(&repo_id);

        let task = tokio::spawn(async move {
            let result = manager.acquire(&job_repo, &job_cancel).await;
            match &result {
                Ok(outcome) => {
                    tracing::info!(
                        repo_id = %job_repo,
                        path = outcome.path.as_str(),
                        snapshot = ?outcome.snapshot,
                        files = outcome.files,
                        "Download completed"
                    );
                    crate::metrics::record_download_completed(outcome.path.as_str());
                }
                Err(e) => {
                    tracing::error!(repo_id = %job_repo, error = %e, "Download failed");
                    crate::metrics::record_download_failed(&job_repo);
                }
            }
            result
        });

        DownloadHandle {
            repo_id,
            cancel,
            task,
        }
    }

    /// Cancel every running job
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }

    /// Run one acquisition to completion
    pub async fn acquire(
        &self,
        repo_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        let lock = self.locks.entry(repo_id.to_string()).or_default().clone();

        let result = {
            let guard = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                guard = lock.lock() => Some(guard),
            };

            let result = match guard {
                Some(_guard) => {
                    tracing::info!(
                        repo_id = %repo_id,
                        accelerated = self.has_accelerated(),
                        "Starting download"
                    );

                    match &self.accelerated {
                        Some(tool) => {
                            self.acquire_accelerated(tool.as_ref(), repo_id, cancel)
                                .await
                        }
                        None => self.acquire_fallback(repo_id, cancel).await,
                    }
                }
                None => Err(DownloadError::Cancelled),
            };
            result
        };

        drop(lock);
        self.locks
            .remove_if(repo_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn acquire_fallback(
        &self,
        repo_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        let snapshot = tokio::select! {
            result = self.fallback.download_snapshot(repo_id) => result?,
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        };

        Ok(DownloadOutcome {
            repo_id: repo_id.to_string(),
            path: AcquisitionPath::Fallback,
            snapshot,
            files: 0,
        })
    }

    async fn acquire_accelerated(
        &self,
        tool: &dyn AcceleratedDownloader,
        repo_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        // Commit and listing come from the same metadata query
        let remote = self.hub.repo_info(repo_id).await?;

        let snapshot = self.layout.snapshot_dir(repo_id, &remote.sha);
        tokio::fs::create_dir_all(&snapshot).await?;

        tracing::info!(
            repo_id = %repo_id,
            revision = %remote.sha,
            file_count = remote.files.len(),
            "Fetching files with accelerated downloader"
        );

        for (index, file) in remote.files.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }

            let relative = safe_relative_path(file)?;
            let target = snapshot.join(&relative);
            let dir = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| snapshot.clone());
            tokio::fs::create_dir_all(&dir).await?;

            let request = FileFetch {
                url: resolve_url(&self.endpoint, repo_id, &remote.sha, file),
                dir,
                file_name: relative
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or_else(|| DownloadError::UnsafePath(file.clone()))?,
                token: self.token.clone(),
            };

            tracing::debug!(
                repo_id = %repo_id,
                file = %file,
                progress = %format!("{}/{}", index + 1, remote.files.len()),
                "Downloading file"
            );

            tool.fetch(&request, cancel).await?;
        }

        let refs = self.layout.refs_dir(repo_id);
        tokio::fs::create_dir_all(&refs).await?;
        tokio::fs::write(refs.join("main"), &remote.sha).await?;

        Ok(DownloadOutcome {
            repo_id: repo_id.to_string(),
            path: AcquisitionPath::Accelerated,
            snapshot,
            files: remote.files.len(),
        })
    }
}

/// Validate a repo-relative path so it cannot escape the snapshot
fn safe_relative_path(file: &str) -> Result<PathBuf, DownloadError> {
    let path = Path::new(file);
    let safe = !file.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(DownloadError::UnsafePath(file.to_string()))
    }
}
