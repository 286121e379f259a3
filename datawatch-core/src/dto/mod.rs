//! Data Transfer Objects
//!
//! Request/response types for the administrative API and the checker
//! definition exchange format used for persistence.

pub mod checker;
pub mod trigger;
