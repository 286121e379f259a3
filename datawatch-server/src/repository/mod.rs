//! Repository Module
//!
//! Data access layer for the server.

pub mod trigger;

pub use trigger::PgTriggerStore;
