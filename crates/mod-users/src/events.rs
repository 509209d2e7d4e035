//! Event driver reacting to this module's own events.

use async_trait::async_trait;
use host_telemetry::ScopedLogger;
use shared_bus::{Event, EventHandler, HandlerResult};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::User;

/// Logs every `user.created` and counts them.
pub struct UserEventDriver {
    logger: ScopedLogger,
    created: AtomicU64,
}

impl UserEventDriver {
    pub fn new(logger: ScopedLogger) -> Self {
        Self {
            logger,
            created: AtomicU64::new(0),
        }
    }

    /// Number of `user.created` events handled so far.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for UserEventDriver {
    async fn handle(&self, event: &Event) -> HandlerResult {
        let user = event
            .payload::<User>()
            .ok_or_else(|| format!("{} carried an unexpected payload", event.event_type()))?;

        self.created.fetch_add(1, Ordering::Relaxed);
        self.logger.info(format!("User created: {} <{}>", user.id, user.email));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::USER_CREATED;

    #[tokio::test]
    async fn test_counts_created_users() {
        let driver = UserEventDriver::new(ScopedLogger::new("users"));
        let user = User::new("Ada", "ada@example.com", "secret1");

        driver.handle(&Event::new(USER_CREATED, user)).await.unwrap();

        assert_eq!(driver.created_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_foreign_payload() {
        let driver = UserEventDriver::new(ScopedLogger::new("users"));

        let result = driver.handle(&Event::new(USER_CREATED, 42_u32)).await;

        assert!(result.is_err());
        assert_eq!(driver.created_count(), 0);
    }
}
