//! Prometheus metrics for email template processing.
//!
//! - Content outcomes (rendered, skipped, fallback to original)
//! - Render latency
//! - Email events handled per kind
//! - Template capabilities skipped while building engines

mod helpers;

pub use helpers::{encode_metrics, EventMetrics, TemplateMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_mail";

lazy_static! {
    /// Content pieces processed, by outcome
    pub static ref CONTENT_PROCESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_content_processed_total", METRIC_PREFIX),
        "Email content fields processed by the template engine",
        &["outcome"]
    ).unwrap();

    /// Time spent compiling and rendering one content field
    pub static ref RENDER_DURATION: Histogram = register_histogram!(
        format!("{}_render_duration_seconds", METRIC_PREFIX),
        "Template compile and render time in seconds",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    ).unwrap();

    /// Email events run through the pipeline, by kind
    pub static ref EMAIL_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_email_events_total", METRIC_PREFIX),
        "Email send/display events dispatched",
        &["kind"]
    ).unwrap();

    /// Capabilities that could not be installed into an engine
    pub static ref CAPABILITIES_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_capabilities_skipped_total", METRIC_PREFIX),
        "Template filters, functions or tests skipped during engine construction"
    ).unwrap();
}
