//! Core domain types
//!
//! Shared between the engine (evaluation), the server (persistence and API)
//! and the CLI (pattern preview).

pub mod check_key;
pub mod pattern;
pub mod trigger;
pub mod variable;
