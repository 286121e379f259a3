//! Trigger lifecycle
//!
//! Couples a trigger with its condition checker. Each poll of an armed trigger
//! yields one transition: still pending, satisfied, or expired. Expiry is
//! checked first, so a trigger whose window has passed never fires for that
//! window even if its data has since appeared.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use datawatch_core::domain::check_key::CheckKey;
use datawatch_core::domain::trigger::Trigger;
use uuid::Uuid;

use crate::error::Result;
use crate::service::checker::{CheckerRegistry, ConditionChecker};

/// Outcome of polling an armed trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pending,
    Satisfied,
    Expired,
}

/// An armed trigger and its checker
pub struct TriggerLifecycle {
    trigger: Trigger,
    checker: Box<dyn ConditionChecker>,
    revision: u64,
}

impl TriggerLifecycle {
    /// Builds the trigger's checker through the registry
    pub fn arm(trigger: Trigger, registry: &CheckerRegistry, checker_type: &str) -> Result<Self> {
        let checker = registry.create(trigger.checker_definition(checker_type))?;
        Ok(Self {
            trigger,
            checker,
            revision: 0,
        })
    }

    /// Tags this arming so a replacement can be told apart from it
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn id(&self) -> Uuid {
        self.trigger.id
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn into_trigger(self) -> Trigger {
        self.trigger
    }

    pub fn set_id(&mut self, id: Uuid) {
        self.trigger.id = id;
    }

    /// Resolved paths of the current window
    pub fn resolved_paths(&self) -> Vec<String> {
        self.checker
            .check_keys()
            .iter()
            .map(|key| key.path.clone())
            .collect()
    }

    pub fn check_keys(&self) -> &[CheckKey] {
        self.checker.check_keys()
    }

    /// Withdraws the checker's pending work, keeping keys in `in_use`
    pub fn release(&self, in_use: &HashSet<CheckKey>) {
        self.checker.release(in_use);
    }

    pub fn poll(&self, now: DateTime<Utc>) -> Transition {
        if self.trigger.is_expired_at(now) {
            Transition::Expired
        } else if self.checker.evaluate() {
            Transition::Satisfied
        } else {
            Transition::Pending
        }
    }

    /// Moves to the next window and starts a new arming period at `now`
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.checker.reset()?;
        self.trigger.variables = self.checker.definition().variables;
        self.trigger.rearm(now);
        Ok(())
    }
}
