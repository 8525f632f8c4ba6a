use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REAPED_JOBS_TOTAL: IntCounter = IntCounter::new(
        "jobreaper_reaped_jobs_total",
        "Total number of jobs reaped."
    )
    .expect("metric can be created");
    pub static ref SKIPPED_JOBS_TOTAL: IntCounter = IntCounter::new(
        "jobreaper_skipped_jobs_total",
        "Jobs selected for reaping but skipped for the cycle."
    )
    .expect("metric can be created");
    pub static ref SINK_ERRORS_TOTAL: IntCounter = IntCounter::new(
        "jobreaper_sink_errors_total",
        "Alert sink send failures."
    )
    .expect("metric can be created");
    pub static ref DELETE_ERRORS_TOTAL: IntCounter = IntCounter::new(
        "jobreaper_delete_errors_total",
        "Failed job or pod deletions."
    )
    .expect("metric can be created");
    pub static ref CYCLE_DURATION_SECONDS: Gauge = Gauge::new(
        "jobreaper_cycle_duration_seconds",
        "Wall-clock duration of the last reap cycle."
    )
    .expect("metric can be created");
}

pub fn register_metrics() {
    REGISTRY
        .register(Box::new(REAPED_JOBS_TOTAL.clone()))
        .expect("failed to register REAPED_JOBS_TOTAL");
    REGISTRY
        .register(Box::new(SKIPPED_JOBS_TOTAL.clone()))
        .expect("failed to register SKIPPED_JOBS_TOTAL");
    REGISTRY
        .register(Box::new(SINK_ERRORS_TOTAL.clone()))
        .expect("failed to register SINK_ERRORS_TOTAL");
    REGISTRY
        .register(Box::new(DELETE_ERRORS_TOTAL.clone()))
        .expect("failed to register DELETE_ERRORS_TOTAL");
    REGISTRY
        .register(Box::new(CYCLE_DURATION_SECONDS.clone()))
        .expect("failed to register CYCLE_DURATION_SECONDS");
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> String {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}
