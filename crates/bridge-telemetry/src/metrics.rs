//! Prometheus metrics for bridge traffic.
//!
//! All metrics follow the naming convention: `bridge_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // HOST BROKER
    // =========================================================================

    /// Requests received by the broker, by target
    pub static ref REQUESTS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("bridge_broker_requests_received_total", "Requests received from the view"),
        &["target"]
    ).expect("metric creation failed");

    /// Responses sent by the broker, by outcome (success/failure)
    pub static ref RESPONSES_SENT: CounterVec = CounterVec::new(
        Opts::new("bridge_broker_responses_sent_total", "Responses sent to the view"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Capability invocations that failed, by target
    pub static ref CAPABILITY_FAILURES: CounterVec = CounterVec::new(
        Opts::new("bridge_capability_failures_total", "Capability operations that failed"),
        &["target"]
    ).expect("metric creation failed");

    /// Capability invocation duration
    pub static ref CAPABILITY_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "bridge_capability_invocation_duration_seconds",
            "Time spent inside capability operations"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).unwrap())
    ).expect("metric creation failed");

    /// Commands pushed from the host into the view
    pub static ref COMMANDS_PUSHED: Counter = Counter::new(
        "bridge_broker_commands_pushed_total",
        "Fire-and-forget commands pushed to the view"
    ).expect("metric creation failed");

    /// Readiness handshake outcomes (greeted/timed_out)
    pub static ref HANDSHAKE_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("bridge_handshake_outcomes_total", "Readiness handshake outcomes"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // VIEW DISPATCHER
    // =========================================================================

    /// Calls issued toward the host
    pub static ref CALLS_ISSUED: Counter = Counter::new(
        "bridge_dispatcher_calls_issued_total",
        "Calls issued by the view"
    ).expect("metric creation failed");

    /// Calls currently waiting for a Response
    pub static ref PENDING_CALLS: Gauge = Gauge::new(
        "bridge_dispatcher_pending_calls",
        "Calls waiting for a Response"
    ).expect("metric creation failed");

    // =========================================================================
    // PROTOCOL
    // =========================================================================

    /// Protocol anomalies by side and kind
    pub static ref PROTOCOL_ANOMALIES: CounterVec = CounterVec::new(
        Opts::new("bridge_protocol_anomalies_total", "Malformed, orphaned or unroutable messages"),
        &["side", "kind"]
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Broker
        Box::new(REQUESTS_RECEIVED.clone()),
        Box::new(RESPONSES_SENT.clone()),
        Box::new(CAPABILITY_FAILURES.clone()),
        Box::new(CAPABILITY_DURATION.clone()),
        Box::new(COMMANDS_PUSHED.clone()),
        Box::new(HANDSHAKE_OUTCOMES.clone()),
        // Dispatcher
        Box::new(CALLS_ISSUED.clone()),
        Box::new(PENDING_CALLS.clone()),
        // Protocol
        Box::new(PROTOCOL_ANOMALIES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Record a protocol anomaly.
pub fn record_anomaly(side: &str, kind: &str) {
    PROTOCOL_ANOMALIES.with_label_values(&[side, kind]).inc();
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
