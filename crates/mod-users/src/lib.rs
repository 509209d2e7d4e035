//! # Users Module
//!
//! Reference feature module for the modular host: user accounts stored in the
//! shared storage, a REST collection under `{base}/users`, and a
//! `user.created` event with its own driver.
//!
//! ## Architecture
//!
//! ```text
//! handler (axum) ──► UserService ──► UserRepository (port)
//!      │                                   │
//!      └── publish user.created            └── StorageUserRepository ──► `users` table
//! ```
//!
//! The crate knows nothing about the host's lifecycle; the host wires it in
//! through an adapter that calls the constructors below phase by phase.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod dto;
pub mod events;
pub mod handler;
pub mod ports;
pub mod service;

pub use adapters::storage::{StorageUserRepository, USERS_SCHEMA};
pub use domain::{User, UserError};
pub use dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
pub use events::UserEventDriver;
pub use handler::{user_routes, UserHandlerState, USER_CREATED};
pub use ports::UserRepository;
pub use service::UserService;
