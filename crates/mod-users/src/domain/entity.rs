use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::password;

/// A user account as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// `salt$digest`, see [`password::hash_password`].
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New account with a fresh id and a salted hash of `plain_password`.
    pub fn new(name: impl Into<String>, email: impl Into<String>, plain_password: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: password::hash_password(plain_password),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_password(&mut self, plain_password: &str) {
        self.password_hash = password::hash_password(plain_password);
    }

    pub fn verify_password(&self, plain_password: &str) -> bool {
        password::verify_password(plain_password, &self.password_hash)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
