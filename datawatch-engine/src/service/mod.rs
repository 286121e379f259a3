//! Service layer
//!
//! Services contain the engine's business logic: the existence cache, the
//! condition checkers built on it, and the lifecycle of armed triggers.

mod cache;
mod checker;
mod lifecycle;
mod manager;

// Re-export traits
pub use checker::ConditionChecker;

// Re-export implementations
pub use cache::ExistenceCache;
pub use checker::{CheckerFactory, CheckerRegistry, DataChecker};
pub use lifecycle::{Transition, TriggerLifecycle};
pub use manager::{CycleReport, TriggerManager};
