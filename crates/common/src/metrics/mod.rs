//! Metrics and observability utilities
//!
//! Prometheus metric descriptions and recording helpers with
//! standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CPSU metrics
pub const METRICS_PREFIX: &str = "cpsu";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s - request timeout
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Upload metrics
    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Total object storage uploads"
    );

    describe_counter!(
        format!("{}_upload_bytes_total", METRICS_PREFIX),
        Unit::Bytes,
        "Total bytes written to object storage"
    );

    // Research sync metrics
    describe_counter!(
        format!("{}_research_sync_total", METRICS_PREFIX),
        Unit::Count,
        "Research synchronisations per personnel"
    );

    describe_counter!(
        format!("{}_research_records_synced_total", METRICS_PREFIX),
        Unit::Count,
        "Research records written by synchronisation"
    );

    // Database metrics
    describe_counter!(
        format!("{}_db_reconnects_total", METRICS_PREFIX),
        Unit::Count,
        "Database handle replacements performed by the keep-alive task"
    );

    describe_counter!(
        format!("{}_reference_rows_created_total", METRICS_PREFIX),
        Unit::Count,
        "Reference rows inserted by lookup-or-create"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record an upload to object storage
pub fn record_upload(category: &str, bytes: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        "category" => category.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        counter!(
            format!("{}_upload_bytes_total", METRICS_PREFIX),
            "category" => category.to_string()
        )
        .increment(bytes as u64);
    }
}

/// Record the outcome of one personnel research sync
pub fn record_research_sync(records: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_research_sync_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    counter!(format!("{}_research_records_synced_total", METRICS_PREFIX))
        .increment(records as u64);
}

pub fn record_reconnect() {
    counter!(format!("{}_db_reconnects_total", METRICS_PREFIX)).increment(1);
}

pub fn record_reference_created(table: &str) {
    counter!(
        format!("{}_reference_rows_created_total", METRICS_PREFIX),
        "table" => table.to_string()
    )
    .increment(1);
}
