//! User domain logic over a [`UserRepository`].

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{User, UserError};
use crate::dto::{CreateUserRequest, UpdateUserRequest};
use crate::ports::UserRepository;

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    /// Serializes the email uniqueness check with the write that follows it.
    write_lock: Mutex<()>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Result<Vec<User>, UserError> {
        self.repository.find_all()
    }

    pub fn get(&self, id: Uuid) -> Result<User, UserError> {
        self.repository.find_by_id(id)?.ok_or(UserError::NotFound)
    }

    pub fn create(&self, request: CreateUserRequest) -> Result<User, UserError> {
        let _guard = self.write_lock.lock();

        if self.repository.find_by_email(&request.email)?.is_some() {
            return Err(UserError::EmailAlreadyUsed);
        }

        let user = User::new(request.name, request.email, &request.password);
        self.repository.create(&user)?;
        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub fn update(&self, id: Uuid, request: UpdateUserRequest) -> Result<User, UserError> {
        let _guard = self.write_lock.lock();

        let mut user = self.repository.find_by_id(id)?.ok_or(UserError::NotFound)?;
        if let Some(other) = self.repository.find_by_email(&request.email)? {
            if other.id != id {
                return Err(UserError::EmailAlreadyUsed);
            }
        }

        user.name = request.name;
        user.email = request.email;
        if let Some(password) = request.password.as_deref() {
            user.set_password(password);
        }
        user.touch();

        self.repository.update(&user)?;
        debug!(user_id = %user.id, "User updated");
        Ok(user)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), UserError> {
        let _guard = self.write_lock.lock();

        if !self.repository.delete(id)? {
            return Err(UserError::NotFound);
        }
        debug!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::{StorageUserRepository, USERS_SCHEMA};
    use shared_types::StorageHandle;

    fn service() -> UserService {
        let storage = StorageHandle::in_memory();
        storage.apply_migrations(&[USERS_SCHEMA]).unwrap();
        UserService::new(Arc::new(StorageUserRepository::new(&storage).unwrap()))
    }

    fn create_request(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
        }
    }

    fn update_request(name: &str, email: &str, password: Option<&str>) -> UpdateUserRequest {
        UpdateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_create_and_get() {
        let service = service();
        let user = service.create(create_request("Ada", "ada@example.com")).unwrap();

        assert_eq!(service.get(user.id).unwrap(), user);
        assert_eq!(service.list().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let service = service();
        service.create(create_request("Ada", "ada@example.com")).unwrap();

        let result = service.create(create_request("Imposter", "ada@example.com"));
        assert!(matches!(result, Err(UserError::EmailAlreadyUsed)));
    }

    #[test]
    fn test_update_keeps_password_unless_given() {
        let service = service();
        let user = service.create(create_request("Ada", "ada@example.com")).unwrap();

        let renamed = service
            .update(user.id, update_request("Ada L.", "ada@example.com", None))
            .unwrap();
        assert_eq!(renamed.name, "Ada L.");
        assert!(renamed.verify_password("secret1"));
        assert!(renamed.updated_at >= user.updated_at);

        let rekeyed = service
            .update(user.id, update_request("Ada L.", "ada@example.com", Some("new-secret")))
            .unwrap();
        assert!(rekeyed.verify_password("new-secret"));
    }

    #[test]
    fn test_update_rejects_taken_email() {
        let service = service();
        service.create(create_request("Ada", "ada@example.com")).unwrap();
        let bob = service.create(create_request("Bob", "bob@example.com")).unwrap();

        let result = service.update(bob.id, update_request("Bob", "ada@example.com", None));
        assert!(matches!(result, Err(UserError::EmailAlreadyUsed)));
    }

    #[test]
    fn test_missing_user() {
        let service = service();
        let id = Uuid::new_v4();

        assert!(matches!(service.get(id), Err(UserError::NotFound)));
        assert!(matches!(service.delete(id), Err(UserError::NotFound)));
        assert!(matches!(
            service.update(id, update_request("X", "x@example.com", None)),
            Err(UserError::NotFound)
        ));
    }
}
