//! Prometheus Metrics Module
//!
//! Gateway decision metrics collected with Prometheus.
//!
//! # Metrics Collected
//! - Pipeline verdicts by route group (forwarded vs rejected, with reason)
//! - Rate limiter decisions by route class

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Pipeline verdict counter by route group and outcome
pub static PIPELINE_VERDICTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipeline_verdicts_total",
            "Pipeline verdicts by route group and outcome",
        )
        .namespace("prompt_gateway"),
        &["group", "outcome"], // outcome: "forwarded" or a rejection reason code
    )
    .expect("Failed to create PIPELINE_VERDICTS_TOTAL metric")
});

/// Rate limiter decision counter by route class
pub static RATE_LIMIT_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rate_limit_decisions_total",
            "Rate limiter decisions by route class",
        )
        .namespace("prompt_gateway"),
        &["class", "decision"], // decision: "allowed", "limited", "unavailable"
    )
    .expect("Failed to create RATE_LIMIT_DECISIONS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(PIPELINE_VERDICTS_TOTAL.clone()))
        .expect("Failed to register PIPELINE_VERDICTS_TOTAL");
    registry
        .register(Box::new(RATE_LIMIT_DECISIONS_TOTAL.clone()))
        .expect("Failed to register RATE_LIMIT_DECISIONS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Record a pipeline verdict for a route group.
pub fn record_pipeline_verdict(group: &str, outcome: &str) {
    PIPELINE_VERDICTS_TOTAL
        .with_label_values(&[group, outcome])
        .inc();
}

/// Record a rate limiter decision for a route class.
pub fn record_rate_limit_decision(class: &str, decision: &str) {
    RATE_LIMIT_DECISIONS_TOTAL
        .with_label_values(&[class, decision])
        .inc();
}
