//! Repository layer
//!
//! Abstractions over the engine's external collaborators: the storage backend
//! being watched, the trigger store, and the downstream action executor.
//!
//! All repositories are trait-based to enable testing and mocking.

mod actions;
mod storage;
mod triggers;

// Re-export traits
pub use actions::ActionExecutor;
pub use storage::StorageBackend;
pub use triggers::TriggerStore;

// Re-export implementations
pub use actions::{FireContext, HttpActionExecutor, LogActionExecutor};
pub use storage::{BackendFactory, BackendRegistry, LocalFsBackend, MemoryBackend};
pub use triggers::InMemoryTriggerStore;
