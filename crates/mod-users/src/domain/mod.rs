//! User domain: entity, password hashing and errors.

pub mod entity;
pub mod errors;
pub mod password;

pub use entity::User;
pub use errors::UserError;
