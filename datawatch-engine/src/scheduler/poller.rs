//! Existence poller
//!
//! `PollingScheduler` is the shared, non-blocking front: checkers submit keys
//! they missed in the cache. `Poller` is the single background worker that
//! drains the pending set against the storage backend and promotes confirmed
//! keys into the cache.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use datawatch_core::domain::check_key::CheckKey;
use parking_lot::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::repository::StorageBackend;
use crate::service::ExistenceCache;

/// Result of submitting a key for checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Already confirmed in the cache, nothing queued
    Cached,
    AlreadyPending,
    Queued,
    /// The pending set is full; the key was dropped
    Dropped,
}

/// Deduplicating set of keys waiting for an existence check
///
/// Iteration order is the `CheckKey` order, so every poll cycle visits keys
/// in the same sequence.
pub struct PollingScheduler {
    pending: Mutex<BTreeSet<CheckKey>>,
    capacity: usize,
    cache: Arc<ExistenceCache>,
}

impl PollingScheduler {
    /// Creates the scheduler together with its one poller
    ///
    /// The poller is the only handle that can run the background loop and it
    /// cannot be cloned, so a process has at most one loop per scheduler.
    pub fn new(
        cache: Arc<ExistenceCache>,
        backend: Arc<dyn StorageBackend>,
        capacity: usize,
        interval: Duration,
    ) -> (Arc<Self>, Poller) {
        let scheduler = Arc::new(Self {
            pending: Mutex::new(BTreeSet::new()),
            capacity,
            cache,
        });
        let poller = Poller {
            scheduler: Arc::clone(&scheduler),
            backend,
            interval,
        };
        (scheduler, poller)
    }

    /// Queues `key` unless it is cached or already pending
    ///
    /// Never waits on the backend.
    pub fn submit(&self, key: CheckKey) -> SubmitOutcome {
        if self.cache.get(&key) {
            return SubmitOutcome::Cached;
        }

        let mut pending = self.pending.lock();
        if pending.contains(&key) {
            return SubmitOutcome::AlreadyPending;
        }
        if pending.len() >= self.capacity {
            drop(pending);
            warn!(
                "Pending checks full ({}), dropping check for {}",
                self.capacity, key
            );
            return SubmitOutcome::Dropped;
        }
        debug!("Queued check for {}", key);
        pending.insert(key);
        SubmitOutcome::Queued
    }

    /// Withdraws pending checks nothing waits on any more
    ///
    /// Returns how many of `keys` were pending.
    pub fn forget(&self, keys: &[CheckKey]) -> usize {
        let mut pending = self.pending.lock();
        let removed = keys.iter().filter(|key| pending.remove(*key)).count();
        if removed > 0 {
            debug!("Withdrew {} pending check(s)", removed);
        }
        removed
    }

    pub fn is_pending(&self, key: &CheckKey) -> bool {
        self.pending.lock().contains(key)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn cache(&self) -> &Arc<ExistenceCache> {
        &self.cache
    }

    fn snapshot(&self) -> Vec<CheckKey> {
        self.pending.lock().iter().cloned().collect()
    }

    fn confirm(&self, key: &CheckKey) {
        self.cache.put(key.clone());
        self.pending.lock().remove(key);
    }
}

/// Counts from one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub checked: usize,
    pub confirmed: usize,
    pub failed: usize,
}

/// The background worker of a `PollingScheduler`
pub struct Poller {
    scheduler: Arc<PollingScheduler>,
    backend: Arc<dyn StorageBackend>,
    interval: Duration,
}

impl Poller {
    /// Checks every key pending at the start of the cycle once
    ///
    /// Backend errors are logged and leave the key pending.
    pub async fn poll_once(&self) -> PollReport {
        let purged = self.scheduler.cache.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }

        let keys = self.scheduler.snapshot();
        debug!("Polling {} pending check(s)", keys.len());

        let mut report = PollReport::default();
        for key in keys {
            report.checked += 1;
            match self.backend.exists(&key.path, &key.principal).await {
                Ok(true) => {
                    info!("Confirmed {}", key);
                    self.scheduler.confirm(&key);
                    report.confirmed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Existence check for {} failed: {}", key, e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Runs the polling loop until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        info!("Starting existence poller (interval: {:?})", self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // a cycle cut short leaves its unchecked keys pending
            tokio::select! {
                _ = cancel.cancelled() => break,
                report = self.poll_once() => {
                    if report.confirmed > 0 {
                        debug!(
                            "Poll cycle confirmed {} of {} check(s)",
                            report.confirmed, report.checked
                        );
                    }
                }
            }
        }

        info!("Existence poller stopped");
    }
}
