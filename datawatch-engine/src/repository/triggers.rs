//! Trigger store
//!
//! Persists trigger definitions. The engine keeps armed copies in memory and
//! writes through to the store on create, advance, and removal.

use std::collections::HashMap;

use async_trait::async_trait;
use datawatch_core::domain::trigger::Trigger;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::StoreError;

/// Repository trait for trigger persistence
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Stores a new trigger and returns the id assigned to it
    ///
    /// The `id` field of the given trigger is ignored.
    async fn insert(&self, trigger: &Trigger) -> Result<Uuid, StoreError>;

    /// Replaces a stored trigger
    async fn update(&self, trigger: &Trigger) -> Result<(), StoreError>;

    /// Deletes a trigger
    async fn remove(&self, id: Uuid) -> Result<(), StoreError>;

    /// All triggers of a data source, oldest submission first
    async fn list_by_source(&self, source: &str) -> Result<Vec<Trigger>, StoreError>;
}

/// In-memory implementation of TriggerStore
#[derive(Default)]
pub struct InMemoryTriggerStore {
    triggers: Mutex<HashMap<Uuid, Trigger>>,
}

impl InMemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn insert(&self, trigger: &Trigger) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut stored = trigger.clone();
        stored.id = id;
        self.triggers.lock().insert(id, stored);
        Ok(id)
    }

    async fn update(&self, trigger: &Trigger) -> Result<(), StoreError> {
        let mut triggers = self.triggers.lock();
        let slot = triggers
            .get_mut(&trigger.id)
            .ok_or(StoreError::NotFound(trigger.id))?;
        *slot = trigger.clone();
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.triggers
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_by_source(&self, source: &str) -> Result<Vec<Trigger>, StoreError> {
        let mut triggers: Vec<Trigger> = self
            .triggers
            .lock()
            .values()
            .filter(|t| t.data_source == source)
            .cloned()
            .collect();
        triggers.sort_by_key(|t| (t.submit_time, t.id));
        Ok(triggers)
    }
}
