use shared_types::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,

    #[error("email already in use")]
    EmailAlreadyUsed,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("malformed user record: {0}")]
    Serialization(#[from] serde_json::Error),
}
