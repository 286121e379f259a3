//! Datawatch Engine
//!
//! Data-availability trigger engine: waits for templated paths to appear in a
//! storage backend and fires each trigger's action once per window.
//!
//! Architecture:
//! - Configuration: engine settings from environment or defaults
//! - Repositories: storage backends, trigger store, action executors
//! - Services: existence cache, condition checkers, trigger lifecycle
//! - Scheduler: the single background poller feeding the cache
//!
//! Checkers never touch the storage backend. A cache miss is submitted to the
//! scheduler and the next evaluation after the poller confirms the path sees
//! a hit.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod repository;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod test_support;

pub use engine::Engine;
pub use error::{EngineError, Result};
