//! # Host Runtime Library
//!
//! The pluggable-module host. Feature crates implement [`Module`]; the
//! [`Host`] attaches storage, builds the shared event bus and router, and
//! drives every registered module through the start-up phases before
//! serving HTTP.
//!
//! ```text
//! config ─► Host::new ─► register(..) ─► initialize() ─► serve(shutdown)
//! ```
//!
//! ## Layout
//!
//! - `registry/` - the module contract and lifecycle phases
//! - `host/` - the orchestrator
//! - `container/` - configuration
//! - `http/` - shared router, host endpoints and middleware
//! - `adapters/` - storage drivers and the bundled feature modules

pub mod adapters;
pub mod container;
pub mod host;
pub mod http;
pub mod registry;

pub use adapters::UsersModule;
pub use container::{ConfigError, HostConfig};
pub use host::{Host, HostError};
pub use registry::{LifecyclePhase, LifecycleState, Module, ModuleError};
