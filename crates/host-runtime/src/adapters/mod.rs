//! # Adapters
//!
//! Concrete infrastructure behind the host's ports: storage drivers, and the
//! adapters that turn feature crates into hosted [`Module`](crate::Module)s.

pub mod storage;
pub mod users;

pub use storage::open_storage;
pub use users::UsersModule;
