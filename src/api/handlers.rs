//! API request handlers

use super::models::{
    CLEANUP_INCOMPLETE, CheckRemoteResponse, CleanupQuery, DeleteResponse, DownloadResponse,
    RepoRequest, SearchRequest, SearchResult, StatusResponse,
};
use super::routes::AppState;
use crate::diagnostics::{self, Diagnostics};
use crate::error::{ManagerError, ManagerResult};
use crate::models::classify::classify_remote;
use crate::models::cleanup::{CleanupReport, cleanup_incomplete};
use crate::models::listing::{CachedModel, ListingOptions, list_cached_models};
use crate::models::snippet::{Snippet, snippet_for};
use crate::models::verify::VerifyReport;
use anyhow::Context;
use axum::{
    Json,
    extract::{Query, State},
};

/// GET / - Liveness and capability flags
pub async fn root(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Hub Cache Manager Online".to_string(),
        aria2: state.downloads.has_accelerated(),
        cuda: state.gpu.is_available(),
    })
}

/// GET /diagnostics - Host RAM, CPU and GPU report
pub async fn get_diagnostics(State(state): State<AppState>) -> ManagerResult<Json<Diagnostics>> {
    let gpu = state.gpu.clone();
    let report = tokio::task::spawn_blocking(move || diagnostics::collect(&gpu))
        .await
        .context("Diagnostics task failed")?;

    Ok(Json(report))
}

/// GET /metrics - Prometheus metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// GET /models - List locally cached models
pub async fn list_models(State(state): State<AppState>) -> ManagerResult<Json<Vec<CachedModel>>> {
    let layout = state.layout.clone();
    let options = ListingOptions {
        complete_threshold_bytes: state.config.complete_threshold_bytes,
        cuda_available: state.gpu.is_available(),
    };

    let models = tokio::task::spawn_blocking(move || list_cached_models(&layout, options))
        .await
        .context("Listing task failed")?;

    crate::metrics::update_cached_model_count(models.len());

    Ok(Json(models))
}

/// DELETE /models - Delete a model's cache entry
pub async fn delete_model(
    State(state): State<AppState>,
    Json(req): Json<RepoRequest>,
) -> ManagerResult<Json<DeleteResponse>> {
    let repo_id = req.repo_id()?.to_string();
    let layout = state.layout.clone();
    let target = repo_id.clone();

    let removed = tokio::task::spawn_blocking(move || layout.remove_model(&target))
        .await
        .context("Delete task failed")??;

    if !removed {
        return Err(ManagerError::NotFound("Non trouvé".to_string()));
    }

    tracing::info!(repo_id = %repo_id, "Deleted model from cache");
    crate::metrics::record_model_deleted(&repo_id);

    Ok(Json(DeleteResponse {
        success: true,
        message: "Supprimé".to_string(),
    }))
}

/// POST /models/check-remote - Classify a model before downloading it
pub async fn check_remote(
    State(state): State<AppState>,
    Json(req): Json<RepoRequest>,
) -> ManagerResult<Json<CheckRemoteResponse>> {
    let repo_id = req.repo_id()?;
    let classification = classify_remote(state.hub.as_ref(), repo_id).await;

    Ok(Json(CheckRemoteResponse::new(repo_id, classification)))
}

/// POST /models/search - Search the hub catalog
pub async fn search_models(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ManagerResult<Json<Vec<SearchResult>>> {
    let results = state
        .hub
        .search(&req.query, req.limit)
        .await
        .map_err(|e| ManagerError::Hub(e.to_string()))?;

    Ok(Json(results.into_iter().map(SearchResult::from).collect()))
}

/// POST /models/download - Queue a background download
///
/// Returns immediately; the outcome is only visible in the cache later.
pub async fn download_model(
    State(state): State<AppState>,
    Json(req): Json<RepoRequest>,
) -> ManagerResult<Json<DownloadResponse>> {
    let repo_id = req.repo_id()?;

    // Dropping the handle detaches the job; shutdown still cancels it
    let _ = state.downloads.spawn(repo_id.to_string());

    Ok(Json(DownloadResponse::queued(repo_id)))
}

/// POST /models/snippet - Example loading code
pub async fn get_snippet(
    State(state): State<AppState>,
    Json(req): Json<RepoRequest>,
) -> ManagerResult<Json<Snippet>> {
    let repo_id = req.repo_id()?;
    Ok(Json(snippet_for(&state.layout, state.hub.as_ref(), repo_id).await))
}

/// POST /models/verify - Check that a cached model is usable
pub async fn verify_model(
    State(state): State<AppState>,
    Json(req): Json<RepoRequest>,
) -> ManagerResult<Json<VerifyReport>> {
    let repo_id = req.repo_id()?.to_string();
    let verifier = state.verifier.clone();

    let report = tokio::task::spawn_blocking(move || verifier.verify(&repo_id))
        .await
        .context("Verification task failed")?;

    Ok(Json(report))
}

/// POST /system/cleanup?type=incomplete - Remove undersized cache entries
pub async fn cleanup(
    State(state): State<AppState>,
    Query(params): Query<CleanupQuery>,
) -> ManagerResult<Json<CleanupReport>> {
    if params.kind != CLEANUP_INCOMPLETE {
        return Err(ManagerError::BadRequest(format!(
            "Unsupported cleanup type: {}",
            params.kind
        )));
    }

    let layout = state.layout.clone();
    let threshold = state.config.cleanup_threshold_bytes;
    let report = tokio::task::spawn_blocking(move || cleanup_incomplete(&layout, threshold))
        .await
        .context("Cleanup task failed")?;

    tracing::info!(count = report.count, "Cleanup finished");
    crate::metrics::record_cleanup_removed(report.count);

    Ok(Json(report))
}
