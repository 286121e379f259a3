//! Datawatch Core
//!
//! Core types for the datawatch data-availability trigger engine.
//!
//! This crate contains:
//! - Domain types: variables, path patterns, check keys and triggers
//! - DTOs: admin API requests/responses and the checker definition format
//! - Period strings (`24h`, `7d`) used for expiry and TTL settings

pub mod domain;
pub mod dto;
pub mod period;
