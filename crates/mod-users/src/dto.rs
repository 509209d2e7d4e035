//! Request and response bodies of the users API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::User;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// Absent or empty keeps the current password.
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 6))]
    pub password: Option<String>,
}

/// A user as returned by the API; the password hash never leaves the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|password| !password.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_password_is_optional() {
        let absent: UpdateUserRequest =
            serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com"}"#).unwrap();
        let empty: UpdateUserRequest =
            serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com","password":""}"#)
                .unwrap();

        assert!(absent.password.is_none());
        assert!(empty.password.is_none());
        assert!(absent.validate().is_ok());
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_short_password_rejected() {
        let create = CreateUserRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "12345".to_string(),
        };
        let update: UpdateUserRequest = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","password":"12345"}"#,
        )
        .unwrap();

        assert!(create.validate().is_err());
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_response_hides_password_hash() {
        let user = User::new("Ada", "ada@example.com", "secret1");
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }
}
