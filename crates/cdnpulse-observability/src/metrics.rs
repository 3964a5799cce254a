//! Prometheus self-metrics for cdnpulse

use cdnpulse_collector::CycleReport;
use lazy_static::lazy_static;
use prometheus::{
    proto::MetricFamily, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Cycle metrics
    pub static ref CYCLES_TOTAL: IntCounter = IntCounter::new(
        "cdnpulse_cycles_total",
        "Total collection cycles run"
    ).unwrap();

    pub static ref CYCLE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cdnpulse_cycle_duration_seconds",
            "Wall time of a collection cycle in seconds"
        ).buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0])
    ).unwrap();

    pub static ref CHANNELS_CONFIGURED: IntGauge = IntGauge::new(
        "cdnpulse_channels_configured",
        "Channels collected in the last cycle"
    ).unwrap();

    // Collection metrics
    pub static ref CATEGORY_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("cdnpulse_category_failures_total", "Categories that produced no observations"),
        &["category", "kind"]
    ).unwrap();

    pub static ref FIELD_DIAGNOSTICS: IntCounterVec = IntCounterVec::new(
        Opts::new("cdnpulse_field_diagnostics_total", "Fields dropped while mapping a payload"),
        &["category"]
    ).unwrap();

    pub static ref SNAPSHOT_OBSERVATIONS: IntGauge = IntGauge::new(
        "cdnpulse_snapshot_observations",
        "Observations in the last snapshot"
    ).unwrap();

    // Delivery metrics
    pub static ref PUBLISH_FAILURES: IntCounter = IntCounter::new(
        "cdnpulse_publish_failures_total",
        "Snapshots the sink could not deliver"
    ).unwrap();
}

/// Register all metrics with the registry
pub fn register_metrics() {
    REGISTRY.register(Box::new(CYCLES_TOTAL.clone())).ok();
    REGISTRY.register(Box::new(CYCLE_DURATION.clone())).ok();
    REGISTRY
        .register(Box::new(CHANNELS_CONFIGURED.clone()))
        .ok();

    REGISTRY.register(Box::new(CATEGORY_FAILURES.clone())).ok();
    REGISTRY.register(Box::new(FIELD_DIAGNOSTICS.clone())).ok();
    REGISTRY
        .register(Box::new(SNAPSHOT_OBSERVATIONS.clone()))
        .ok();

    REGISTRY.register(Box::new(PUBLISH_FAILURES.clone())).ok();
}

/// Registered self-metric families
pub fn self_metric_families() -> Vec<MetricFamily> {
    REGISTRY.gather()
}

/// Get metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&self_metric_families())
        .unwrap_or_default()
}

/// Record the outcome of one collection cycle
pub fn record_cycle(report: &CycleReport) {
    CYCLES_TOTAL.inc();
    CYCLE_DURATION.observe(report.elapsed.as_secs_f64());
    CHANNELS_CONFIGURED.set(report.channels as i64);
    SNAPSHOT_OBSERVATIONS.set(report.snapshot.len() as i64);

    for failure in &report.failures {
        CATEGORY_FAILURES
            .with_label_values(&[failure.category.as_str(), failure.kind().as_str()])
            .inc();
    }

    for diagnostic in &report.diagnostics {
        FIELD_DIAGNOSTICS
            .with_label_values(&[diagnostic.category.as_str()])
            .inc();
    }

    if !report.published() {
        PUBLISH_FAILURES.inc();
    }
}
