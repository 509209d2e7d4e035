//! Driven ports of the users module.

use uuid::Uuid;

use crate::domain::{User, UserError};

/// Persistence for user accounts.
///
/// `create` and `update` are upserts at this level; uniqueness rules live in
/// [`UserService`](crate::service::UserService).
pub trait UserRepository: Send + Sync {
    fn find_all(&self) -> Result<Vec<User>, UserError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError>;

    fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    fn create(&self, user: &User) -> Result<(), UserError>;

    fn update(&self, user: &User) -> Result<(), UserError>;

    /// Returns whether a row was removed.
    fn delete(&self, id: Uuid) -> Result<bool, UserError>;
}
