//! # Lifecycle Orchestrator
//!
//! [`Host`] owns the registered modules and the shared infrastructure, and
//! runs the start-up phases phase-major:
//!
//! ```text
//!            module A     module B     module C
//! migrate      ──1──────────2──────────3──►
//! initialize   ──4──────────5──────────6──►
//! drivers      ──7──────────8──────────9──►
//! routes       ──10─────────11─────────12─►
//! ```
//!
//! The first failure stops start-up: no later phase runs for any module and
//! the host moves to [`LifecycleState::Failed`].

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use host_telemetry::{
    metric_inc, PhaseTimer, ScopedLogger, LIFECYCLE_PHASE_FAILURES, MODULES_REGISTERED,
};
use shared_bus::EventBus;
use shared_types::{StorageError, StorageHandle};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::adapters::open_storage;
use crate::container::HostConfig;
use crate::http;
use crate::registry::{LifecyclePhase, LifecycleState, Module, ModuleError};

/// Host error type.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("module {0:?} is already registered")]
    DuplicateModule(String),

    #[error("cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: LifecycleState,
    },

    #[error("failed to attach storage: {0}")]
    Storage(#[source] StorageError),

    #[error("phase {phase} failed for module {module:?}: {source}")]
    Phase {
        phase: LifecyclePhase,
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl HostError {
    /// Phase in which start-up failed, if it failed in one.
    #[must_use]
    pub fn phase(&self) -> Option<LifecyclePhase> {
        match self {
            Self::Storage(_) => Some(LifecyclePhase::AttachStorage),
            Self::Phase { phase, .. } => Some(*phase),
            Self::Serve(_) => Some(LifecyclePhase::Serve),
            _ => None,
        }
    }
}

/// The pluggable-module host.
pub struct Host {
    config: HostConfig,
    /// Registration order is execution order.
    modules: Vec<Box<dyn Module>>,
    state: LifecycleState,
    logger: ScopedLogger,
    storage: Option<StorageHandle>,
    bus: Option<Arc<EventBus>>,
    router: Option<Router>,
}

impl Host {
    pub fn new(config: HostConfig) -> Self {
        let logger = ScopedLogger::new(config.server.app_name.clone());
        Self {
            config,
            modules: Vec::new(),
            state: LifecycleState::Created,
            logger,
            storage: None,
            bus: None,
            router: None,
        }
    }

    /// Append a module. Only allowed before [`initialize`](Self::initialize).
    pub fn register(&mut self, module: Box<dyn Module>) -> Result<(), HostError> {
        self.expect_state(LifecycleState::Created, "register modules")?;

        let name = module.name().to_string();
        if self.modules.iter().any(|m| m.name() == name) {
            return Err(HostError::DuplicateModule(name));
        }

        info!("[Host] Registered module: {}", name);
        metric_inc!(MODULES_REGISTERED);
        self.modules.push(module);
        Ok(())
    }

    /// Run phases 1 to 6 for every registered module.
    pub async fn initialize(&mut self) -> Result<(), HostError> {
        self.expect_state(LifecycleState::Created, "initialize")?;
        info!("[Host] Initializing {} module(s)", self.modules.len());

        // Phase 1
        let storage = {
            let _timer = PhaseTimer::start(LifecyclePhase::AttachStorage.as_str());
            match open_storage(&self.config.database, &self.config.pool) {
                Ok(storage) => storage,
                Err(e) => {
                    error!("[Host] Failed to attach storage: {}", e);
                    self.fail(LifecyclePhase::AttachStorage);
                    return Err(HostError::Storage(e));
                }
            }
        };
        self.storage = Some(storage.clone());
        self.state = LifecycleState::StorageAttached;

        // Phase 2
        {
            let _timer = PhaseTimer::start(LifecyclePhase::Migrate.as_str());
            for index in 0..self.modules.len() {
                let result = self.modules[index].migrate(&storage).await;
                self.check(LifecyclePhase::Migrate, index, result)?;
                info!("[Host] Migrations completed for module: {}", self.modules[index].name());
            }
        }

        // Phase 3
        let (bus, mut router) = {
            let _timer = PhaseTimer::start(LifecyclePhase::BuildInfrastructure.as_str());
            let bus = Arc::new(EventBus::with_capacity(self.config.bus.capacity));
            let router = http::build_router(&self.config.server, Arc::clone(&bus));
            info!("[Host] Event bus ready (capacity {})", bus.capacity());
            (bus, router)
        };
        self.bus = Some(Arc::clone(&bus));

        // Phase 4
        {
            let _timer = PhaseTimer::start(LifecyclePhase::Initialize.as_str());
            for index in 0..self.modules.len() {
                let logger = self.logger.scoped(self.modules[index].name());
                info!("[Host] Initializing module: {}", self.modules[index].name());
                let result = self.modules[index]
                    .initialize(storage.clone(), logger)
                    .await;
                self.check(LifecyclePhase::Initialize, index, result)?;
            }
        }

        // Phase 5
        {
            let _timer = PhaseTimer::start(LifecyclePhase::RegisterEventDrivers.as_str());
            for module in &self.modules {
                info!("[Host] Registering event drivers for module: {}", module.name());
                module.register_event_drivers(&bus);
            }
        }

        // Phase 6
        {
            let _timer = PhaseTimer::start(LifecyclePhase::RegisterRoutes.as_str());
            let base_path = self.config.api_base_path();
            for module in &self.modules {
                info!("[Host] Registering routes for module: {}", module.name());
                router = module.register_routes(router, &base_path);
            }
        }

        self.router = Some(http::with_middleware(router, &self.config.server));
        self.state = LifecycleState::Initialized;
        info!("[Host] Application initialization completed");
        Ok(())
    }

    /// Phase 7: bind the configured address and serve until `shutdown`
    /// resolves, then drain the event bus.
    pub async fn serve<F>(&mut self, shutdown: F) -> Result<(), HostError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.expect_state(LifecycleState::Initialized, "serve")?;

        let address = self.config.server.bind_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("[Host] Failed to bind {}: {}", address, e);
                self.fail(LifecyclePhase::Serve);
                return Err(HostError::Serve(e));
            }
        };

        self.serve_with_listener(listener, shutdown).await
    }

    /// Phase 7 on an already bound listener.
    pub async fn serve_with_listener<F>(
        &mut self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), HostError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.expect_state(LifecycleState::Initialized, "serve")?;
        let Some(router) = self.router.clone() else {
            return Err(HostError::InvalidState {
                action: "serve without a router",
                state: self.state,
            });
        };

        match listener.local_addr() {
            Ok(addr) => info!("[Host] Starting server on {}", addr),
            Err(e) => info!("[Host] Starting server (address unavailable: {})", e),
        }
        info!(
            "[Host] Modules under {}: {}",
            self.config.api_base_path(),
            self.module_names().join(", ")
        );
        self.state = LifecycleState::Serving;

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.shutdown().await;
        served.map_err(|e| {
            error!("[Host] Server error: {}", e);
            metric_inc!(LIFECYCLE_PHASE_FAILURES, &[LifecyclePhase::Serve.as_str()]);
            HostError::Serve(e)
        })
    }

    /// Close the event bus, delivering every queued event first.
    pub async fn shutdown(&self) {
        if let Some(bus) = &self.bus {
            info!("[Host] Draining event bus...");
            bus.close().await;
        }
        info!("[Host] Shutdown complete");
    }

    /// The fully wired router, once initialized.
    #[must_use]
    pub fn router(&self) -> Option<Router> {
        self.router.clone()
    }

    #[must_use]
    pub fn event_bus(&self) -> Option<Arc<EventBus>> {
        self.bus.clone()
    }

    #[must_use]
    pub fn storage(&self) -> Option<StorageHandle> {
        self.storage.clone()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Registered module names in registration order.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    fn expect_state(&self, expected: LifecycleState, action: &'static str) -> Result<(), HostError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HostError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    /// Turn a module failure into a fatal start-up error.
    fn check(
        &mut self,
        phase: LifecyclePhase,
        index: usize,
        result: Result<(), ModuleError>,
    ) -> Result<(), HostError> {
        let Err(source) = result else {
            return Ok(());
        };

        let module = self.modules[index].name().to_string();
        error!("[Host] {} failed for module {}: {}", phase, module, source);
        self.fail(phase);
        Err(HostError::Phase {
            phase,
            module,
            source,
        })
    }

    fn fail(&mut self, phase: LifecyclePhase) {
        metric_inc!(LIFECYCLE_PHASE_FAILURES, &[phase.as_str()]);
        self.state = LifecycleState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_host_is_empty() {
        let host = Host::new(HostConfig::default());
        assert_eq!(host.state(), LifecycleState::Created);
        assert!(host.module_names().is_empty());
        assert!(host.storage().is_none());
        assert!(host.router().is_none());
    }

    #[test]
    fn test_error_phase() {
        let err = HostError::Phase {
            phase: LifecyclePhase::RegisterRoutes,
            module: "users".into(),
            source: ModuleError::NotInitialized,
        };
        assert_eq!(err.phase(), Some(LifecyclePhase::RegisterRoutes));
        assert_eq!(HostError::DuplicateModule("users".into()).phase(), None);
        assert!(err.to_string().contains("register_routes"));
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_every_phase_logs_each_module() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut host = Host::new(HostConfig::default());
        host.register(Box::new(crate::UsersModule::new())).unwrap();
        host.initialize().await.unwrap();

        let output = String::from_utf8(capture.0.lock().clone()).unwrap();
        for line in [
            "Migrations completed for module: users",
            "Initializing module: users",
            "Registering event drivers for module: users",
            "Registering routes for module: users",
        ] {
            assert!(output.contains(line), "missing {line:?} in:\n{output}");
        }
    }

    #[tokio::test]
    async fn test_registration_and_failures_are_counted() {
        let registered = MODULES_REGISTERED.get();
        let failed = LIFECYCLE_PHASE_FAILURES
            .with_label_values(&["attach_storage"])
            .get();

        let mut config = HostConfig::default();
        config.database.driver = "cassandra".into();
        let mut host = Host::new(config);
        host.register(Box::new(crate::UsersModule::new())).unwrap();
        assert!(host.initialize().await.is_err());

        assert!(MODULES_REGISTERED.get() > registered);
        assert!(
            LIFECYCLE_PHASE_FAILURES
                .with_label_values(&["attach_storage"])
                .get()
                > failed
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_bus() {
        let mut host = Host::new(HostConfig::default());
        host.initialize().await.unwrap();
        let bus = host.event_bus().unwrap();

        host.shutdown().await;

        assert!(bus.is_closed());
    }
}
