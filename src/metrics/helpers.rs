//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    CAPABILITIES_SKIPPED_TOTAL, CONTENT_PROCESSED_TOTAL, EMAIL_EVENTS_TOTAL, RENDER_DURATION,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording template processing metrics
pub struct TemplateMetrics;

impl TemplateMetrics {
    /// Record the outcome of one processed field
    pub fn record_outcome(outcome: &str) {
        CONTENT_PROCESSED_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record compile + render time
    pub fn observe_render(elapsed: Duration) {
        RENDER_DURATION.observe(elapsed.as_secs_f64());
    }

    /// Record capabilities skipped while building an engine
    pub fn record_capabilities_skipped(count: usize) {
        CAPABILITIES_SKIPPED_TOTAL.inc_by(count as u64);
    }
}

/// Helper struct for recording email event metrics
pub struct EventMetrics;

impl EventMetrics {
    pub fn record_event(kind: &str) {
        EMAIL_EVENTS_TOTAL.with_label_values(&[kind]).inc();
    }
}
