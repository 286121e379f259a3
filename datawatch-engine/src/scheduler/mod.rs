//! Scheduler layer for the engine
//!
//! The only layer that talks to the storage backend. Checkers hand it the
//! keys they could not find in the existence cache; its single background
//! poller checks them and fills the cache.

pub mod poller;

pub use poller::{PollReport, Poller, PollingScheduler, SubmitOutcome};
