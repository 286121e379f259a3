//! Existence check keys

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved path together with the principal it is checked as
///
/// This is the unit of existence tracking: the cache key and the dedup key of
/// the pending-check set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckKey {
    pub path: String,
    pub principal: String,
}

impl CheckKey {
    pub fn new(path: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            principal: principal.into(),
        }
    }
}

/// Orders by the concatenation `principal + path`, falling back to the
/// field pair so that distinct keys never compare equal.
impl Ord for CheckKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.principal.bytes().chain(self.path.bytes());
        let rhs = other.principal.bytes().chain(other.path.bytes());
        lhs.cmp(rhs)
            .then_with(|| self.principal.cmp(&other.principal))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for CheckKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (as {})", self.path, self.principal)
    }
}
