//! Trigger manager
//!
//! Owns the armed triggers of one data source. Administrative operations go
//! through the trigger store first and then update the armed set; the
//! lifecycle loop polls every armed trigger once per cycle.
//!
//! The armed set is only locked for in-memory work. Store writes and action
//! firing happen after the lock is released. A write-back from the lifecycle
//! loop is skipped when the trigger was updated or removed while its action
//! was firing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use datawatch_core::domain::check_key::CheckKey;
use datawatch_core::domain::trigger::{Recurrence, Trigger, TriggerAction};
use datawatch_core::dto::trigger::CreateTrigger;
use datawatch_core::period::parse_period;
use parking_lot::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result, StoreError};
use crate::repository::{ActionExecutor, FireContext, TriggerStore};
use crate::service::checker::CheckerRegistry;
use crate::service::lifecycle::{Transition, TriggerLifecycle};

/// Counts from one lifecycle cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pending: usize,
    pub fired: usize,
    pub expired: usize,
}

/// Work decided under the lock and carried out after it
enum Followup {
    Retire {
        trigger: Trigger,
        fire: Option<FireContext>,
    },
    Advance {
        trigger: Trigger,
        revision: u64,
        fire: FireContext,
    },
}

pub struct TriggerManager {
    data_source: String,
    checker_type: String,
    default_time_to_expire: Duration,
    registry: Arc<CheckerRegistry>,
    store: Arc<dyn TriggerStore>,
    executor: Arc<dyn ActionExecutor>,
    clock: Arc<dyn Clock>,
    armed: Mutex<HashMap<Uuid, TriggerLifecycle>>,
    revisions: AtomicU64,
    /// Held across a store write and the armed-set change that goes with it
    store_writes: tokio::sync::Mutex<()>,
}

impl TriggerManager {
    pub fn new(
        config: &EngineConfig,
        registry: Arc<CheckerRegistry>,
        store: Arc<dyn TriggerStore>,
        executor: Arc<dyn ActionExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            data_source: config.data_source.clone(),
            checker_type: config.checker_type.clone(),
            default_time_to_expire: config.default_time_to_expire,
            registry,
            store,
            executor,
            clock,
            armed: Mutex::new(HashMap::new()),
            revisions: AtomicU64::new(0),
            store_writes: tokio::sync::Mutex::new(()),
        }
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// Arms every stored trigger of this data source
    ///
    /// Triggers whose checker cannot be built are logged and skipped. Returns
    /// the number of triggers armed.
    pub async fn load(&self) -> Result<usize> {
        let triggers = self.store.list_by_source(&self.data_source).await?;
        let total = triggers.len();

        let mut loaded = Vec::with_capacity(total);
        for trigger in triggers {
            let id = trigger.id;
            match self.arm(trigger) {
                Ok(lifecycle) => loaded.push(lifecycle),
                Err(e) => error!("Skipping trigger {}: {}", id, e),
            }
        }

        let count = loaded.len();
        let mut armed = self.armed.lock();
        for lifecycle in loaded {
            armed.insert(lifecycle.id(), lifecycle);
        }
        info!(
            "Loaded {} of {} '{}' trigger(s)",
            count, total, self.data_source
        );
        Ok(count)
    }

    /// Validates, stores, and arms a new trigger
    pub async fn create_trigger(&self, req: CreateTrigger) -> Result<Trigger> {
        let now = self.clock.now();
        let time_to_expire = match req.time_to_expire.as_deref() {
            Some(period) => parse_period(period)?,
            None => self.default_time_to_expire,
        };

        let mut variables = req.variables;
        variables.fill_calendar_defaults(now);

        let action = match req.webhook_url {
            Some(url) => TriggerAction::Webhook { url },
            None => TriggerAction::ExecuteFlow {
                project_id: req.project_id,
                flow_name: req.flow_name.clone(),
            },
        };

        let trigger = Trigger {
            id: Uuid::nil(),
            data_source: self.data_source.clone(),
            path_patterns: req.path_patterns,
            variables,
            principal: req.principal,
            time_to_expire,
            action,
            recurrence: req.recurrence,
            project_id: req.project_id,
            flow_name: req.flow_name,
            last_modify_time: now,
            submit_time: now,
            armed_at: now,
            submit_user: req.submit_user,
        };
        trigger.validate_patterns()?;

        let mut lifecycle = self.arm(trigger)?;
        let id = self.store.insert(lifecycle.trigger()).await?;
        lifecycle.set_id(id);

        let stored = lifecycle.trigger().clone();
        self.armed.lock().insert(id, lifecycle);
        info!(
            "Created trigger {} for flow {}:{} ({} pattern(s))",
            id,
            stored.project_id,
            stored.flow_name,
            stored.path_patterns.len()
        );
        Ok(stored)
    }

    /// Replaces a trigger's definition and re-arms it
    pub async fn update_trigger(&self, mut trigger: Trigger) -> Result<Trigger> {
        trigger.data_source = self.data_source.clone();
        trigger.last_modify_time = self.clock.now();
        trigger.validate_patterns()?;

        let lifecycle = self.arm(trigger)?;
        let _writes = self.store_writes.lock().await;
        self.store.update(lifecycle.trigger()).await?;

        let updated = lifecycle.trigger().clone();
        let mut armed = self.armed.lock();
        if let Some(previous) = armed.insert(updated.id, lifecycle) {
            previous.release(&keys_in_use(&armed));
        }
        info!("Updated trigger {}", updated.id);
        Ok(updated)
    }

    /// Deletes a trigger from the store and disarms it
    pub async fn remove_trigger(&self, id: Uuid) -> Result<()> {
        let _writes = self.store_writes.lock().await;
        self.store.remove(id).await?;

        let mut armed = self.armed.lock();
        if let Some(lifecycle) = armed.remove(&id) {
            lifecycle.release(&keys_in_use(&armed));
        }
        info!("Removed trigger {}", id);
        Ok(())
    }

    /// The armed copy of a trigger
    pub fn get_trigger(&self, id: Uuid) -> Result<Trigger> {
        self.armed
            .lock()
            .get(&id)
            .map(|lifecycle| lifecycle.trigger().clone())
            .ok_or(EngineError::NotFound(id))
    }

    /// Stored triggers of `source`, defaulting to this manager's data source
    ///
    /// Grouped by flow key; triggers of one flow keep the store's order.
    pub async fn list_triggers(&self, source: Option<&str>) -> Result<Vec<Trigger>> {
        let source = source.unwrap_or(&self.data_source);
        let mut triggers = self.store.list_by_source(source).await?;
        triggers.sort_by(|a, b| a.flow_key().cmp(&b.flow_key()));
        Ok(triggers)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().len()
    }

    /// Polls every armed trigger once
    pub async fn run_cycle(&self) -> CycleReport {
        let now = self.clock.now();
        let mut report = CycleReport::default();
        let followups = self.collect_transitions(now, &mut report);

        for followup in followups {
            match followup {
                Followup::Retire { trigger, fire } => {
                    if let Some(ctx) = fire {
                        self.fire(&trigger, &ctx).await;
                        info!("Retired trigger {}", trigger.id);
                    } else {
                        info!("Trigger {} expired without firing", trigger.id);
                    }

                    let _writes = self.store_writes.lock().await;
                    let rearmed = self.armed.lock().contains_key(&trigger.id);
                    if rearmed {
                        debug!("Trigger {} was re-armed while firing, keeping it", trigger.id);
                        continue;
                    }
                    match self.store.remove(trigger.id).await {
                        Ok(()) => {}
                        Err(StoreError::NotFound(_)) => {
                            debug!("Trigger {} was already removed", trigger.id)
                        }
                        Err(e) => error!("Failed to remove trigger {}: {}", trigger.id, e),
                    }
                }
                Followup::Advance {
                    trigger,
                    revision,
                    fire,
                } => {
                    self.fire(&trigger, &fire).await;
                    info!(
                        "Advanced trigger {} (armed until {:?})",
                        trigger.id,
                        trigger.expires_at()
                    );

                    let _writes = self.store_writes.lock().await;
                    let current = self
                        .armed
                        .lock()
                        .get(&trigger.id)
                        .map(TriggerLifecycle::revision);
                    if current != Some(revision) {
                        debug!(
                            "Trigger {} changed while firing, not persisting its advance",
                            trigger.id
                        );
                        continue;
                    }
                    if let Err(e) = self.store.update(&trigger).await {
                        error!("Failed to persist trigger {}: {}", trigger.id, e);
                    }
                }
            }
        }

        if report.fired > 0 || report.expired > 0 {
            info!(
                "Trigger cycle: {} fired, {} expired, {} pending",
                report.fired, report.expired, report.pending
            );
        }
        report
    }

    fn collect_transitions(&self, now: DateTime<Utc>, report: &mut CycleReport) -> Vec<Followup> {
        let mut armed = self.armed.lock();
        let mut followups = Vec::new();
        let mut finished = Vec::new();

        for (id, lifecycle) in armed.iter_mut() {
            match lifecycle.poll(now) {
                Transition::Pending => report.pending += 1,
                Transition::Expired => {
                    report.expired += 1;
                    finished.push((*id, None));
                }
                Transition::Satisfied => {
                    report.fired += 1;
                    let ctx = FireContext {
                        trigger_id: *id,
                        paths: lifecycle.resolved_paths(),
                        fired_at: now,
                    };
                    match lifecycle.trigger().recurrence {
                        Recurrence::Once => finished.push((*id, Some(ctx))),
                        Recurrence::Recurring => match lifecycle.advance(now) {
                            Ok(()) => followups.push(Followup::Advance {
                                trigger: lifecycle.trigger().clone(),
                                revision: lifecycle.revision(),
                                fire: ctx,
                            }),
                            Err(e) => {
                                warn!("Cannot advance trigger {}, retiring it: {}", id, e);
                                finished.push((*id, Some(ctx)));
                            }
                        },
                    }
                }
            }
        }

        let retired: Vec<_> = finished
            .into_iter()
            .filter_map(|(id, fire)| armed.remove(&id).map(|lifecycle| (lifecycle, fire)))
            .collect();
        if !retired.is_empty() {
            let in_use = keys_in_use(&armed);
            for (lifecycle, fire) in retired {
                lifecycle.release(&in_use);
                followups.push(Followup::Retire {
                    trigger: lifecycle.into_trigger(),
                    fire,
                });
            }
        }
        followups
    }

    fn arm(&self, trigger: Trigger) -> Result<TriggerLifecycle> {
        let revision = self.revisions.fetch_add(1, Ordering::Relaxed) + 1;
        let lifecycle = TriggerLifecycle::arm(trigger, &self.registry, &self.checker_type)?;
        Ok(lifecycle.with_revision(revision))
    }

    async fn fire(&self, trigger: &Trigger, ctx: &FireContext) {
        info!("Firing trigger {}", trigger.id);
        if let Err(e) = self.executor.fire(&trigger.action, ctx).await {
            error!("Action of trigger {} failed: {}", trigger.id, e);
        }
    }

    /// Runs lifecycle cycles at `interval` until `cancel` fires
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        info!("Starting trigger lifecycle loop (interval: {:?})", interval);

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        info!("Trigger lifecycle loop stopped");
    }
}

/// Every key an armed trigger still waits on
fn keys_in_use(armed: &HashMap<Uuid, TriggerLifecycle>) -> HashSet<CheckKey> {
    armed
        .values()
        .flat_map(|lifecycle| lifecycle.check_keys().iter().cloned())
        .collect()
}
