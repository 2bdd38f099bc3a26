// Telemetry module for structured logging and metrics

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging
///
/// `RUST_LOG` takes precedence over the configured level. With `json` set,
/// log lines are emitted as JSON objects carrying the current span.
pub fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let layer = if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer().with_target(false).with_filter(env_filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level = log_level, json = json, "Logging initialized");
    Ok(())
}

/// Install the Prometheus recorder and describe all metrics
///
/// The returned handle renders the scrape output for the `/metrics` endpoint.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    describe_counter!(
        "gadi_laws_downloaded_total",
        "Laws downloaded from gesetze-im-internet.de"
    );
    describe_counter!("gadi_laws_ingested_total", "Laws written to the database");
    describe_counter!("gadi_laws_removed_total", "Laws removed after vanishing upstream");
    describe_counter!(
        "gadi_law_parse_failures_total",
        "Law XML documents that could not be parsed"
    );
    describe_histogram!(
        "gadi_ingest_duration_seconds",
        "Duration of a full ingest run in seconds"
    );

    Ok(handle)
}

/// Write the current metrics as a Prometheus textfile
///
/// Written under a temporary name, then renamed into place.
pub fn write_metrics_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let staging = path.with_extension("prom.tmp");
    std::fs::write(&staging, handle.render()).with_context(|| format!("Failed to write {}", staging.display()))?;
    std::fs::rename(&staging, path).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Wrote metrics textfile");
    Ok(())
}

#[inline]
pub fn record_law_downloaded(gii_slug: &str) {
    counter!("gadi_laws_downloaded_total").increment(1);
    tracing::trace!(gii_slug = gii_slug, "Recorded download");
}

#[inline]
pub fn record_law_ingested() {
    counter!("gadi_laws_ingested_total").increment(1);
}

#[inline]
pub fn record_laws_removed(count: usize) {
    counter!("gadi_laws_removed_total").increment(count as u64);
}

#[inline]
pub fn record_parse_failure(gii_slug: &str) {
    counter!("gadi_law_parse_failures_total", "gii_slug" => gii_slug.to_string()).increment(1);
}

#[inline]
pub fn record_ingest_duration(duration_seconds: f64) {
    histogram!("gadi_ingest_duration_seconds").record(duration_seconds);
}
