//! Prometheus metrics for the broadcast service.
//!
//! - Store metrics (notifications created/deleted)
//! - Broadcast metrics (sends by outcome, deliveries, failures)
//! - Inbox metrics (delivered entries, reads)

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "waqf_notify";

lazy_static! {
    /// Notifications created
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_created_total", METRIC_PREFIX),
        "Total notifications created"
    ).unwrap();

    /// Notifications deleted
    pub static ref NOTIFICATIONS_DELETED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_deleted_total", METRIC_PREFIX),
        "Total notifications deleted"
    ).unwrap();

    /// Send attempts by outcome (sent, rejected, resolution_failed)
    pub static ref SENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sends_total", METRIC_PREFIX),
        "Total broadcast send attempts",
        &["outcome"]
    ).unwrap();

    /// Successful per-recipient deliveries
    pub static ref DELIVERIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_deliveries_total", METRIC_PREFIX),
        "Total successful recipient deliveries"
    ).unwrap();

    /// Failed per-recipient deliveries (transport error or timeout)
    pub static ref DELIVERY_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_delivery_failures_total", METRIC_PREFIX),
        "Total failed recipient deliveries"
    ).unwrap();

    /// Recipients resolved per send
    pub static ref AUDIENCE_SIZE: Histogram = register_histogram!(
        format!("{}_audience_size", METRIC_PREFIX),
        "Distribution of resolved audience sizes",
        vec![1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    ).unwrap();

    /// Inbox entries marked read
    pub static ref INBOX_READS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_inbox_reads_total", METRIC_PREFIX),
        "Total inbox entries marked read"
    ).unwrap();
}

/// Helpers for broadcast metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    pub fn record_sent() {
        SENDS_TOTAL.with_label_values(&["sent"]).inc();
    }

    pub fn record_rejected() {
        SENDS_TOTAL.with_label_values(&["rejected"]).inc();
    }

    pub fn record_resolution_failed() {
        SENDS_TOTAL.with_label_values(&["resolution_failed"]).inc();
    }

    pub fn record_audience(size: usize) {
        AUDIENCE_SIZE.observe(size as f64);
    }

    pub fn record_delivered(count: u64) {
        DELIVERIES_TOTAL.inc_by(count);
    }

    pub fn record_failed(count: u64) {
        DELIVERY_FAILURES_TOTAL.inc_by(count);
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
