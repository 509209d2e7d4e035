//! HTTP surface of the users module, mounted at `{base}/users`.
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | GET | `/` | 200, all users |
//! | GET | `/:id` | 200 |
//! | POST | `/` | 201, publishes [`USER_CREATED`] |
//! | PUT | `/:id` | 200 |
//! | DELETE | `/:id` | 204 |

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use shared_bus::{Event, EventPublisher};
use shared_types::{ApiError, ValidatedJson};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::UserError;
use crate::dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::service::UserService;

/// Event type published after a user is stored. Payload: [`User`](crate::User).
pub const USER_CREATED: &str = "user.created";

/// State shared by the user handlers.
#[derive(Clone)]
pub struct UserHandlerState {
    service: Arc<UserService>,
    publisher: Arc<dyn EventPublisher>,
}

impl UserHandlerState {
    pub fn new(service: Arc<UserService>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { service, publisher }
    }
}

/// Router for the users collection, to be nested under `{base}/users`.
pub fn user_routes(state: UserHandlerState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => ApiError::not_found("User not found"),
            UserError::EmailAlreadyUsed => ApiError::conflict("Email already in use"),
            other => {
                error!(error = %other, "User request failed");
                ApiError::internal(other.to_string())
            }
        }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid user ID"))
}

async fn list_users(State(state): State<UserHandlerState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.service.list()?;
    Ok(Json(users.iter().map(UserResponse::from).collect::<Vec<_>>()))
}

async fn get_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.get(parse_id(&id)?)?;
    Ok(Json(UserResponse::from(&user)))
}

async fn create_user(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.create(request)?;
    let response = UserResponse::from(&user);

    // The user is already stored; a closed bus only loses the notification.
    if let Err(e) = state.publisher.publish(Event::new(USER_CREATED, user)).await {
        warn!(error = %e, user_id = %response.id, "Failed to publish {USER_CREATED}");
    }

    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.update(parse_id(&id)?, request)?;
    Ok(Json(UserResponse::from(&user)))
}

async fn delete_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(parse_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::{StorageUserRepository, USERS_SCHEMA};
    use crate::domain::User;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::BusError;
    use shared_types::StorageHandle;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: Event) -> Result<(), BusError> {
            self.events.lock().push(event);
            Ok(())
        }

        fn events_published(&self) -> u64 {
            self.events.lock().len() as u64
        }
    }

    fn app() -> (Router, Arc<RecordingPublisher>) {
        let storage = StorageHandle::in_memory();
        storage.apply_migrations(&[USERS_SCHEMA]).unwrap();
        let repository = StorageUserRepository::new(&storage).unwrap();
        let service = Arc::new(UserService::new(Arc::new(repository)));
        let publisher = Arc::new(RecordingPublisher::default());
        let state = UserHandlerState::new(service, publisher.clone());
        (Router::new().nest("/users", user_routes(state)), publisher)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn ada() -> Value {
        json!({"name": "Ada", "email": "ada@example.com", "password": "secret1"})
    }

    #[tokio::test]
    async fn test_create_publishes_user_created() {
        let (app, publisher) = app();

        let (status, body) = call(&app, "POST", "/users", Some(ada())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "ada@example.com");
        assert!(body.get("password_hash").is_none());

        let events = publisher.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), USER_CREATED);
        let user = events[0].payload::<User>().unwrap();
        assert_eq!(user.id.to_string(), body["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (app, publisher) = app();
        call(&app, "POST", "/users", Some(ada())).await;

        let (status, body) = call(&app, "POST", "/users", Some(ada())).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Email already in use");
        assert_eq!(publisher.events_published(), 1);
    }

    #[tokio::test]
    async fn test_invalid_body_rejected() {
        let (app, publisher) = app();

        let (status, body) = call(
            &app,
            "POST",
            "/users",
            Some(json!({"name": "Ada", "email": "nope", "password": "123"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["email"].is_array());
        assert!(body["fields"]["password"].is_array());
        assert_eq!(publisher.events_published(), 0);
    }

    #[tokio::test]
    async fn test_get_update_delete() {
        let (app, _) = app();
        let (_, created) = call(&app, "POST", "/users", Some(ada())).await;
        let uri = format!("/users/{}", created["id"].as_str().unwrap());

        let (status, fetched) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Ada");

        let (status, updated) = call(
            &app,
            "PUT",
            &uri,
            Some(json!({"name": "Ada Lovelace", "email": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Ada Lovelace");

        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn test_list_and_bad_id() {
        let (app, _) = app();
        call(&app, "POST", "/users", Some(ada())).await;

        let (status, list) = call(&app, "GET", "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = call(&app, "GET", "/users/42", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid user ID");
    }
}
