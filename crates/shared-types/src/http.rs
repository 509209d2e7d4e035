//! # HTTP Contract
//!
//! Error body and validated JSON extractor used by every module's handlers, so
//! all modules answer bad input the same way:
//!
//! ```json
//! {"error": "validation failed", "fields": {"email": ["email"]}}
//! ```

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

/// Per-field validation messages, ordered by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// JSON error response: `{"error": message}` plus `fields` for validation
/// failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 400 carrying every failed rule by field.
    pub fn validation(errors: &ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, failures) in errors.field_errors() {
            let messages = failures
                .iter()
                .map(|failure| match &failure.message {
                    Some(message) => message.to_string(),
                    None => failure.code.to_string(),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }

        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".to_string(),
            fields: Some(fields),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.fields {
            Some(fields) => json!({ "error": self.message, "fields": fields }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// JSON body that has been deserialized and passed its `validator` rules.
///
/// Malformed JSON and failed rules are both rejected with 400 before the
/// handler runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        value.validate().map_err(|e| ApiError::validation(&e))?;
        Ok(Self(value))
    }
}
