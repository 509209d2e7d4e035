//! Structured logging.
//!
//! The host installs one global `tracing` subscriber at start-up. Modules never
//! touch it; each receives a [`ScopedLogger`] whose events carry a `module`
//! field, so a single sink and level filter serve every module while lines
//! stay attributable.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Safe to call more than once: if a global subscriber is already set (by an
/// earlier call or by a test harness), the existing one is kept.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {e}", config.log_level)))?;

    let installed = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    match installed {
        Ok(()) => tracing::debug!(
            service = %config.service_name,
            json_logs = config.json_logs,
            "Logging initialized"
        ),
        Err(_) => tracing::debug!("Global subscriber already installed; keeping it"),
    }

    Ok(())
}

/// Logger bound to one module name.
///
/// Cheap to clone. Child loggers share the global sink and level; only the
/// `module` field changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedLogger {
    name: String,
}

impl ScopedLogger {
    /// Root logger for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Child logger named `parent.child`.
    pub fn scoped(&self, child: &str) -> Self {
        Self {
            name: format!("{}.{}", self.name, child),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!(module = %self.name, "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!(module = %self.name, "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(module = %self.name, "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(module = %self.name, "{}", message.as_ref());
    }
}
