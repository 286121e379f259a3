//! Condition checkers
//!
//! A checker turns one trigger's definition into a boolean condition. The data
//! checker is satisfied when every resolved path is confirmed in the existence
//! cache; misses are handed to the polling scheduler and never checked inline.
//!
//! Checker types are instantiated from persisted definitions through
//! `CheckerRegistry`, keyed by the definition's `type`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use datawatch_core::domain::check_key::CheckKey;
use datawatch_core::dto::checker::{CheckerDefinition, DefinitionError};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::scheduler::{PollingScheduler, SubmitOutcome};

/// A condition bound to one trigger
pub trait ConditionChecker: Send + Sync {
    fn checker_type(&self) -> &str;

    fn id(&self) -> &str;

    /// Whether the condition currently holds
    ///
    /// Must not block on I/O.
    fn evaluate(&self) -> bool;

    /// Moves the condition forward to the next window
    fn reset(&mut self) -> Result<()>;

    /// The definition reflecting the checker's current window
    fn definition(&self) -> CheckerDefinition;

    /// Keys the condition currently depends on
    fn check_keys(&self) -> &[CheckKey];

    /// Withdraws this checker's outstanding work when it is disarmed
    ///
    /// Keys in `in_use` are still needed by other checkers and are kept.
    fn release(&self, in_use: &HashSet<CheckKey>);
}

/// Checker waiting for every path pattern to exist
pub struct DataChecker {
    def: CheckerDefinition,
    keys: Vec<CheckKey>,
    scheduler: Arc<PollingScheduler>,
}

impl DataChecker {
    /// Binds a definition to the scheduler
    ///
    /// Fails if any pattern references an undeclared variable.
    pub fn new(def: CheckerDefinition, scheduler: Arc<PollingScheduler>) -> Result<Self> {
        let keys = Self::resolve_keys(&def)?;
        Ok(Self {
            def,
            keys,
            scheduler,
        })
    }

    /// Registers the data checker under `type_name`
    pub fn register(
        registry: &mut CheckerRegistry,
        type_name: &str,
        scheduler: Arc<PollingScheduler>,
    ) {
        registry.register_checker_type(
            type_name,
            Box::new(move |def: CheckerDefinition| {
                Ok(Box::new(DataChecker::new(def, Arc::clone(&scheduler))?)
                    as Box<dyn ConditionChecker>)
            }),
        );
    }

    fn resolve_keys(def: &CheckerDefinition) -> Result<Vec<CheckKey>> {
        def.path_patterns
            .iter()
            .map(|pattern| {
                let path = pattern.resolve(&def.variables)?;
                Ok(CheckKey::new(path, def.principal.clone()))
            })
            .collect()
    }
}

impl ConditionChecker for DataChecker {
    fn checker_type(&self) -> &str {
        &self.def.checker_type
    }

    fn id(&self) -> &str {
        &self.def.checker_id
    }

    fn evaluate(&self) -> bool {
        let cache = self.scheduler.cache();
        let mut satisfied = true;
        // every miss is submitted, not only the first
        for key in &self.keys {
            if cache.get(key) {
                continue;
            }
            satisfied = false;
            if self.scheduler.submit(key.clone()) == SubmitOutcome::Queued {
                debug!("Checker {} is waiting on {}", self.def.checker_id, key);
            }
        }
        satisfied
    }

    fn reset(&mut self) -> Result<()> {
        let mut next = self.def.clone();
        next.variables.advance();
        self.keys = Self::resolve_keys(&next)?;
        self.def = next;
        Ok(())
    }

    fn definition(&self) -> CheckerDefinition {
        self.def.clone()
    }

    fn check_keys(&self) -> &[CheckKey] {
        &self.keys
    }

    fn release(&self, in_use: &HashSet<CheckKey>) {
        let unused: Vec<CheckKey> = self
            .keys
            .iter()
            .filter(|key| !in_use.contains(*key))
            .cloned()
            .collect();
        self.scheduler.forget(&unused);
    }
}

/// Constructor for a checker from its persisted definition
pub type CheckerFactory =
    Box<dyn Fn(CheckerDefinition) -> Result<Box<dyn ConditionChecker>> + Send + Sync>;

/// Checker types keyed by type id
#[derive(Default)]
pub struct CheckerRegistry {
    factories: HashMap<String, CheckerFactory>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `name` available to `create`, replacing any earlier factory
    pub fn register_checker_type(&mut self, name: impl Into<String>, factory: CheckerFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiates the checker named by the definition's type
    pub fn create(&self, def: CheckerDefinition) -> Result<Box<dyn ConditionChecker>> {
        let factory = self
            .factories
            .get(&def.checker_type)
            .ok_or_else(|| EngineError::UnknownCheckerType(def.checker_type.clone()))?;
        factory(def)
    }

    /// Parses a serialized definition and instantiates it
    pub fn create_from_json(&self, value: serde_json::Value) -> Result<Box<dyn ConditionChecker>> {
        let def: CheckerDefinition =
            serde_json::from_value(value).map_err(DefinitionError::Malformed)?;
        self.create(def)
    }
}
