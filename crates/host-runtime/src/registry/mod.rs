//! # Module Contract
//!
//! Every feature plugged into the host implements [`Module`]. The host, not
//! the module, decides when each method runs.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                               Host                               │
//! │                                                                  │
//! │  1 AttachStorage ─► 2 Migrate ─► 3 BuildInfrastructure           │
//! │        ─► 4 Initialize ─► 5 RegisterEventDrivers                 │
//! │        ─► 6 RegisterRoutes ─► 7 Serve                            │
//! │                                                                  │
//! │  Phases are phase-major: phase N finishes for every module       │
//! │  (in registration order) before phase N+1 starts for any.        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A module therefore sees its tables migrated before it is initialized,
//! every module initialized before any event driver subscribes, and every
//! subscription in place before the first route can accept a request.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use host_telemetry::ScopedLogger;
use shared_bus::EventBus;
use shared_types::{StorageError, StorageHandle};
use thiserror::Error;

/// Trait that all feature modules implement to be hosted.
#[async_trait]
pub trait Module: Send + Sync {
    /// Unique name; also the suffix of the module's logger.
    fn name(&self) -> &str;

    /// Phase 2: bring the module's tables to the schema it expects.
    ///
    /// Must be idempotent. Runs before [`initialize`](Module::initialize).
    async fn migrate(&self, storage: &StorageHandle) -> Result<(), ModuleError>;

    /// Phase 4: build repositories, services and handlers.
    async fn initialize(
        &mut self,
        storage: StorageHandle,
        logger: ScopedLogger,
    ) -> Result<(), ModuleError>;

    /// Phase 5: subscribe event handlers on the shared bus.
    ///
    /// This is also the only point where a module receives the bus for
    /// publishing.
    fn register_event_drivers(&self, bus: &Arc<EventBus>);

    /// Phase 6: add routes under `base_path` and hand the router back.
    fn register_routes(&self, router: Router, base_path: &str) -> Router;
}

/// Module error type.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("migration failed: {0}")]
    Migration(String),

    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A method that needs phase 4 state ran before it.
    #[error("module not initialized")]
    NotInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The seven start-up phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    AttachStorage,
    Migrate,
    BuildInfrastructure,
    Initialize,
    RegisterEventDrivers,
    RegisterRoutes,
    Serve,
}

impl LifecyclePhase {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttachStorage => "attach_storage",
            Self::Migrate => "migrate",
            Self::BuildInfrastructure => "build_infrastructure",
            Self::Initialize => "initialize",
            Self::RegisterEventDrivers => "register_event_drivers",
            Self::RegisterRoutes => "register_routes",
            Self::Serve => "serve",
        }
    }

    /// All phases in execution order.
    #[must_use]
    pub fn all() -> [LifecyclePhase; 7] {
        [
            Self::AttachStorage,
            Self::Migrate,
            Self::BuildInfrastructure,
            Self::Initialize,
            Self::RegisterEventDrivers,
            Self::RegisterRoutes,
            Self::Serve,
        ]
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host lifecycle state. Moves strictly forward; `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepting registrations.
    Created,
    /// Storage opened, modules being prepared.
    StorageAttached,
    /// Phases 1 to 6 completed for every module.
    Initialized,
    /// Accepting requests.
    Serving,
    /// A phase failed; nothing further runs.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_and_labels() {
        let labels: Vec<_> = LifecyclePhase::all().iter().map(|p| p.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "attach_storage",
                "migrate",
                "build_infrastructure",
                "initialize",
                "register_event_drivers",
                "register_routes",
                "serve",
            ]
        );
        assert_eq!(LifecyclePhase::Migrate.to_string(), "migrate");
    }

    #[test]
    fn test_module_error_wraps_storage() {
        let err: ModuleError = StorageError::UnknownTable("orders".to_string()).into();
        assert!(matches!(err, ModuleError::Storage(_)));
        assert_eq!(err.to_string(), "Unknown table: orders (no migration applied)");
    }
}
