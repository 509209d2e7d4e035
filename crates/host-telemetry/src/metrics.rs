//! Prometheus metrics for the modular host.
//!
//! All metrics follow the naming convention: `host_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: lifecycle phase failures, registered modules
//! - **Gauge**: event bus totals, refreshed from the bus on every scrape
//! - **Histogram**: time spent in each lifecycle phase

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LIFECYCLE METRICS
    // =========================================================================

    /// Modules accepted by the host
    pub static ref MODULES_REGISTERED: IntCounter = IntCounter::new(
        "host_modules_registered_total",
        "Total number of modules registered with the host"
    ).expect("metric creation failed");

    /// Start-up aborted in a phase
    pub static ref LIFECYCLE_PHASE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("host_lifecycle_phase_failures_total", "Fatal failures by lifecycle phase"),
        &["phase"]
    ).expect("metric creation failed");

    /// Phase duration across all modules
    pub static ref LIFECYCLE_PHASE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "host_lifecycle_phase_duration_seconds",
            "Time spent completing a lifecycle phase for every module"
        ).buckets(exponential_buckets(0.0001, 4.0, 10).expect("bucket layout")),
        &["phase"]
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Events accepted by the bus
    pub static ref EVENT_BUS_PUBLISHED: IntGauge = IntGauge::new(
        "host_eventbus_events_published",
        "Events accepted by the event bus"
    ).expect("metric creation failed");

    /// Events whose dispatch finished
    pub static ref EVENT_BUS_DISPATCHED: IntGauge = IntGauge::new(
        "host_eventbus_events_dispatched",
        "Events fully dispatched to their handlers"
    ).expect("metric creation failed");

    /// Handler errors and panics
    pub static ref EVENT_BUS_HANDLER_FAILURES: IntGauge = IntGauge::new(
        "host_eventbus_handler_failures",
        "Handler invocations that returned an error or panicked"
    ).expect("metric creation failed");

    /// Published but not yet dispatched
    pub static ref EVENT_BUS_IN_FLIGHT: IntGauge = IntGauge::new(
        "host_eventbus_events_in_flight",
        "Events published but not yet fully dispatched"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Repeated calls are harmless; collectors already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Lifecycle
        Box::new(MODULES_REGISTERED.clone()),
        Box::new(LIFECYCLE_PHASE_FAILURES.clone()),
        Box::new(LIFECYCLE_PHASE_DURATION.clone()),
        // Event Bus
        Box::new(EVENT_BUS_PUBLISHED.clone()),
        Box::new(EVENT_BUS_DISPATCHED.clone()),
        Box::new(EVENT_BUS_HANDLER_FAILURES.clone()),
        Box::new(EVENT_BUS_IN_FLIGHT.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Copy event bus totals into the bus gauges.
pub fn record_bus_stats(published: u64, dispatched: u64, handler_failures: u64, in_flight: usize) {
    EVENT_BUS_PUBLISHED.set(saturating_i64(published));
    EVENT_BUS_DISPATCHED.set(saturating_i64(dispatched));
    EVENT_BUS_HANDLER_FAILURES.set(saturating_i64(handler_failures));
    EVENT_BUS_IN_FLIGHT.set(i64::try_from(in_flight).unwrap_or(i64::MAX));
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    register_metrics()?;

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Timer guard for automatic histogram observation.
pub struct PhaseTimer {
    phase: &'static str,
    start: std::time::Instant,
}

impl PhaseTimer {
    /// Start timing `phase`. Observation happens on drop.
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        LIFECYCLE_PHASE_DURATION
            .with_label_values(&[self.phase])
            .observe(self.start.elapsed().as_secs_f64());
    }
}
