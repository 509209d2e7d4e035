//! # Users Module Adapter
//!
//! Plugs the `mod-users` crate into the host lifecycle.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::Router;
use host_telemetry::ScopedLogger;
use mod_users::{
    user_routes, StorageUserRepository, UserEventDriver, UserHandlerState, UserService,
    USERS_SCHEMA, USER_CREATED,
};
use shared_bus::{EventBus, EventPublisher};
use shared_types::StorageHandle;

use crate::registry::{Module, ModuleError};

pub const USERS_MODULE: &str = "users";

/// State built in phase 4.
struct UsersRuntime {
    service: Arc<UserService>,
    driver: Arc<UserEventDriver>,
    logger: ScopedLogger,
}

/// The users feature as a hosted [`Module`].
#[derive(Default)]
pub struct UsersModule {
    runtime: Option<UsersRuntime>,
    /// Captured in phase 5 for the handlers' publisher.
    bus: OnceLock<Arc<EventBus>>,
}

impl UsersModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `user.created` driver, once initialized.
    pub fn event_driver(&self) -> Option<Arc<UserEventDriver>> {
        self.runtime.as_ref().map(|runtime| Arc::clone(&runtime.driver))
    }

    fn runtime(&self) -> Result<&UsersRuntime, ModuleError> {
        self.runtime.as_ref().ok_or(ModuleError::NotInitialized)
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &str {
        USERS_MODULE
    }

    async fn migrate(&self, storage: &StorageHandle) -> Result<(), ModuleError> {
        storage.apply_migrations(&[USERS_SCHEMA])?;
        Ok(())
    }

    async fn initialize(
        &mut self,
        storage: StorageHandle,
        logger: ScopedLogger,
    ) -> Result<(), ModuleError> {
        logger.info("Initializing user module");

        let repository = StorageUserRepository::new(&storage)
            .map_err(|e| ModuleError::Initialization(e.to_string()))?;
        logger.debug("User repository initialized");

        let service = Arc::new(UserService::new(Arc::new(repository)));
        logger.debug("User service initialized");

        let driver = Arc::new(UserEventDriver::new(logger.scoped("events")));

        self.runtime = Some(UsersRuntime {
            service,
            driver,
            logger,
        });
        Ok(())
    }

    fn register_event_drivers(&self, bus: &Arc<EventBus>) {
        let runtime = match self.runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(module = USERS_MODULE, error = %e, "Event drivers skipped");
                return;
            }
        };

        bus.subscribe(USER_CREATED, runtime.driver.clone());
        // Set once per host; a second call keeps the first bus.
        let _ = self.bus.set(Arc::clone(bus));
        runtime.logger.info(format!("Subscribed to {USER_CREATED}"));
    }

    fn register_routes(&self, router: Router, base_path: &str) -> Router {
        let (runtime, bus) = match (self.runtime(), self.bus.get()) {
            (Ok(runtime), Some(bus)) => (runtime, bus),
            (Err(e), _) => {
                tracing::warn!(module = USERS_MODULE, error = %e, "Routes skipped");
                return router;
            }
            (Ok(_), None) => {
                tracing::warn!(module = USERS_MODULE, "Routes skipped: no event bus");
                return router;
            }
        };

        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let state = UserHandlerState::new(Arc::clone(&runtime.service), publisher);
        let mount = format!("{base_path}/users");
        runtime.logger.info(format!("Registering user routes at {mount}"));

        router.nest(&mount, user_routes(state))
    }
}
