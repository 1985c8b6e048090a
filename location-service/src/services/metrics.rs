//! Metrics collection and Prometheus export.
//!
//! Installs the exporter and records the domain counters.

use crate::models::UpdateOutcome;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const SNAPSHOT_CACHE_TOTAL: &str = "location_snapshot_cache_total";
pub const BATCH_UPDATES_TOTAL: &str = "location_batch_updates_total";

/// Initialize the metrics recorder. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics handle already initialized");
    }

    describe_counter!(
        SNAPSHOT_CACHE_TOTAL,
        "Location snapshot lookups by result (hit, miss, error)"
    );
    describe_counter!(
        BATCH_UPDATES_TOTAL,
        "Batch update records by outcome (updated, failed)"
    );

    Ok(())
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_snapshot_lookup(result: &'static str) {
    counter!(SNAPSHOT_CACHE_TOTAL, "result" => result).increment(1);
}

pub fn record_batch_outcome(outcome: &UpdateOutcome) {
    counter!(BATCH_UPDATES_TOTAL, "outcome" => "updated")
        .increment(outcome.updated_ids.len() as u64);
    counter!(BATCH_UPDATES_TOTAL, "outcome" => "failed")
        .increment(outcome.failed_ids.len() as u64);
}
