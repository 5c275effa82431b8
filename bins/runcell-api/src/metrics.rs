// Prometheus metrics for the runcell API

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Once;

lazy_static! {
    // Global registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Executions finished (counter with language and outcome labels)
    pub static ref EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("runcell_executions_total", "Total number of executions finished"),
        &["language", "outcome"]
    )
    .expect("metric can be created");

    // Execution wall time histogram (in milliseconds)
    pub static ref EXECUTION_TIME: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "runcell_execution_time_ms",
            "Execution time in milliseconds, compile stage included"
        )
        .buckets(vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 15000.0]),
        &["language"]
    )
    .expect("metric can be created");

    // Requests rejected before execution
    pub static ref REQUESTS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("runcell_requests_rejected_total", "Total requests rejected before execution"),
        &["reason"]
    )
    .expect("metric can be created");

    // Executions currently holding or waiting for a slot
    pub static ref EXECUTIONS_IN_FLIGHT: IntGauge = IntGauge::new(
        "runcell_executions_in_flight",
        "Executions currently in progress"
    )
    .expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry; later calls are no-ops
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(EXECUTIONS_TOTAL.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(EXECUTION_TIME.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(REQUESTS_REJECTED.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(EXECUTIONS_IN_FLIGHT.clone()))
            .expect("collector can be registered");
    });
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a finished execution; `outcome` is "success" or the failure stage
pub fn record_execution(language: &str, outcome: &str, execution_time_ms: f64) {
    EXECUTIONS_TOTAL.with_label_values(&[language, outcome]).inc();
    EXECUTION_TIME.with_label_values(&[language]).observe(execution_time_ms);
}

/// Record a rejected request
pub fn record_rejected(reason: &str) {
    REQUESTS_REJECTED.with_label_values(&[reason]).inc();
}

/// Tracks one in-flight execution for as long as it lives
pub struct InFlight;

impl InFlight {
    pub fn start() -> Self {
        EXECUTIONS_IN_FLIGHT.inc();
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        EXECUTIONS_IN_FLIGHT.dec();
    }
}
