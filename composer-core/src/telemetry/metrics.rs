//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Compose latency is dominated by the transport round trip.
    let buckets = vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("Failed to set histogram buckets")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup (not just after first use).
pub fn describe_metrics() {
    describe_counter!(
        "composer_emails_total",
        "Compose operations by outcome (sent or failure kind)"
    );
    describe_histogram!(
        "composer_compose_duration_seconds",
        "End-to-end compose duration in seconds, including delivery"
    );
    describe_counter!(
        "composer_attachments_released_total",
        "Attachment resources released"
    );

    counter!("composer_emails_total", "outcome" => "sent").absolute(0);
    counter!("composer_attachments_released_total").absolute(0);
}
