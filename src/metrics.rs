//! Prometheus metrics

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Setup Prometheus metrics exporter
/// Returns a handle that can be used to retrieve metrics
pub fn setup_metrics() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!("Prometheus metrics exporter installed");

    Ok(handle)
}

/// Record a download accepted for background processing
pub fn record_download_queued(repo_id: &str) {
    metrics::counter!("hub_manager_downloads_queued_total",
        "model" => repo_id.to_string()
    )
    .increment(1);
}

/// Record a finished download and the acquisition path it took
pub fn record_download_completed(path: &str) {
    metrics::counter!("hub_manager_downloads_completed_total",
        "path" => path.to_string()
    )
    .increment(1);
}

/// Record a failed or cancelled download
pub fn record_download_failed(repo_id: &str) {
    metrics::counter!("hub_manager_downloads_failed_total",
        "model" => repo_id.to_string()
    )
    .increment(1);
}

/// Record cache entries removed by cleanup
pub fn record_cleanup_removed(count: usize) {
    metrics::counter!("hub_manager_cleanup_removed_total").increment(count as u64);
}

/// Record a model deleted through the API
pub fn record_model_deleted(repo_id: &str) {
    metrics::counter!("hub_manager_models_deleted_total",
        "model" => repo_id.to_string()
    )
    .increment(1);
}

/// Update cached model count gauge
pub fn update_cached_model_count(count: usize) {
    metrics::gauge!("hub_manager_cached_models").set(count as f64);
}
