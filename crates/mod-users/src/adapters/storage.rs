//! [`UserRepository`] over the host's shared storage, one JSON row per user in
//! the `users` table keyed by id.

use shared_types::{SchemaDescriptor, StorageHandle, Table};
use uuid::Uuid;

use crate::domain::{User, UserError};
use crate::ports::UserRepository;

/// Tables owned by this module.
pub const USERS_SCHEMA: SchemaDescriptor = SchemaDescriptor::new("users", 1);

pub struct StorageUserRepository {
    table: Table,
}

impl StorageUserRepository {
    /// Fails with `UnknownTable` until [`USERS_SCHEMA`] has been migrated.
    pub fn new(storage: &StorageHandle) -> Result<Self, UserError> {
        Ok(Self {
            table: storage.table(USERS_SCHEMA.table)?,
        })
    }

    fn write(&self, user: &User) -> Result<(), UserError> {
        let bytes = serde_json::to_vec(user)?;
        self.table.put(&user.id.to_string(), &bytes)?;
        Ok(())
    }
}

impl UserRepository for StorageUserRepository {
    fn find_all(&self) -> Result<Vec<User>, UserError> {
        let mut users = self
            .table
            .list()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice::<User>(&bytes))
            .collect::<Result<Vec<_>, _>>()?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        match self.table.get(&id.to_string())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self
            .find_all()?
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email)))
    }

    fn create(&self, user: &User) -> Result<(), UserError> {
        self.write(user)
    }

    fn update(&self, user: &User) -> Result<(), UserError> {
        self.write(user)
    }

    fn delete(&self, id: Uuid) -> Result<bool, UserError> {
        Ok(self.table.delete(&id.to_string())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::StorageError;

    fn repository() -> StorageUserRepository {
        let storage = StorageHandle::in_memory();
        storage.apply_migrations(&[USERS_SCHEMA]).unwrap();
        StorageUserRepository::new(&storage).unwrap()
    }

    #[test]
    fn test_requires_migration() {
        let storage = StorageHandle::in_memory();
        let result = StorageUserRepository::new(&storage);

        assert!(matches!(
            result,
            Err(UserError::Storage(StorageError::UnknownTable(_)))
        ));
    }

    #[test]
    fn test_round_trip_and_email_lookup() {
        let repo = repository();
        let user = User::new("Ada", "ada@example.com", "secret1");
        repo.create(&user).unwrap();

        assert_eq!(repo.find_by_id(user.id).unwrap(), Some(user.clone()));
        assert_eq!(
            repo.find_by_email("ADA@example.com").unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert!(repo.find_by_email("bob@example.com").unwrap().is_none());
    }

    #[test]
    fn test_find_all_in_creation_order() {
        let repo = repository();
        let first = User::new("Ada", "ada@example.com", "secret1");
        let mut second = User::new("Bob", "bob@example.com", "secret2");
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        repo.create(&second).unwrap();
        repo.create(&first).unwrap();

        let names: Vec<_> = repo.find_all().unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);
    }

    #[test]
    fn test_delete() {
        let repo = repository();
        let user = User::new("Ada", "ada@example.com", "secret1");
        repo.create(&user).unwrap();

        assert!(repo.delete(user.id).unwrap());
        assert!(!repo.delete(user.id).unwrap());
        assert!(repo.find_by_id(user.id).unwrap().is_none());
    }
}
