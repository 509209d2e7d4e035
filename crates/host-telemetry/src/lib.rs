//! # Host Telemetry
//!
//! Observability for the modular host.
//!
//! ## Components
//!
//! - **Logging**: one global `tracing` subscriber, human or JSON formatted,
//!   plus [`ScopedLogger`] handles given to modules
//! - **Metrics**: Prometheus counters, gauges and histograms for the lifecycle
//!   and the event bus, exposed as text by [`gather_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use host_telemetry::{init_telemetry, ScopedLogger, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//!
//! let logger = ScopedLogger::new(&config.service_name).scoped("users");
//! logger.info("ready");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HOST_SERVICE_NAME` | `modular-host` | Root logger name |
//! | `HOST_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `HOST_JSON_LOGS` | `false` | JSON output (defaults on in containers) |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, ScopedLogger};
pub use metrics::{
    gather_metrics, record_bus_stats, register_metrics, PhaseTimer, EVENT_BUS_DISPATCHED,
    EVENT_BUS_HANDLER_FAILURES, EVENT_BUS_IN_FLIGHT, EVENT_BUS_PUBLISHED, LIFECYCLE_PHASE_DURATION,
    LIFECYCLE_PHASE_FAILURES, MODULES_REGISTERED, REGISTRY,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
