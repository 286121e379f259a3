//! Shared fakes for unit tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use datawatch_core::domain::pattern::PathPattern;
use datawatch_core::domain::trigger::{Recurrence, Trigger, TriggerAction};
use datawatch_core::domain::variable::{Variable, VariableSet};
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::{ActionError, StorageError};
use crate::repository::{ActionExecutor, FireContext, StorageBackend};

/// A once trigger armed at 2024-06-13 17:00 UTC for 24h, with `YEAR = 2024`
pub fn sample_trigger(source: &str, patterns: &[&str]) -> Trigger {
    let submitted = Utc.with_ymd_and_hms(2024, 6, 13, 17, 0, 0).unwrap();
    Trigger {
        id: Uuid::new_v4(),
        data_source: source.to_string(),
        path_patterns: patterns.iter().map(|p| PathPattern::new(*p)).collect(),
        variables: VariableSet::new().with("YEAR", Variable::fixed(2024)),
        principal: "etl".to_string(),
        time_to_expire: Duration::from_secs(24 * 3600),
        action: TriggerAction::ExecuteFlow {
            project_id: 7,
            flow_name: "daily".to_string(),
        },
        recurrence: Recurrence::Once,
        project_id: 7,
        flow_name: "daily".to_string(),
        last_modify_time: submitted,
        submit_time: submitted,
        armed_at: submitted,
        submit_user: "azkaban".to_string(),
    }
}

/// Backend answering from a path table, with injectable failures
///
/// Unknown paths do not exist. Calls are recorded as `principal:path`.
#[derive(Default)]
pub struct ScriptedBackend {
    answers: Mutex<HashMap<String, bool>>,
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &str, exists: bool) {
        self.answers.lock().insert(path.to_string(), exists);
    }

    /// Makes the next `times` checks of `path` fail
    pub fn fail_next(&self, path: &str, times: usize) {
        self.failures.lock().insert(path.to_string(), times);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    async fn exists(&self, path: &str, principal: &str) -> Result<bool, StorageError> {
        self.calls.lock().push(format!("{}:{}", principal, path));

        if let Some(remaining) = self.failures.lock().get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::Unavailable("scripted failure".to_string()));
            }
        }
        Ok(self.answers.lock().get(path).copied().unwrap_or(false))
    }
}

/// Backend that takes `delay` to answer "no"
pub struct SlowBackend {
    delay: Duration,
    called: Notify,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            called: Notify::new(),
        }
    }

    /// Resolves once a check has started
    pub async fn wait_for_call(&self) {
        self.called.notified().await;
    }
}

#[async_trait]
impl StorageBackend for SlowBackend {
    async fn exists(&self, _path: &str, _principal: &str) -> Result<bool, StorageError> {
        self.called.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(false)
    }
}

/// Executor recording every firing
#[derive(Default)]
pub struct RecordingExecutor {
    fired: Mutex<Vec<(TriggerAction, FireContext)>>,
    fail: Mutex<bool>,
    hold: Mutex<bool>,
    entered: Notify,
    released: Notify,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later firing return an error (still recorded)
    pub fn fail_all(&self) {
        *self.fail.lock() = true;
    }

    pub fn fired(&self) -> Vec<(TriggerAction, FireContext)> {
        self.fired.lock().clone()
    }

    /// Makes later firings wait for `release_firing`
    pub fn hold_firings(&self) {
        *self.hold.lock() = true;
    }

    /// Resolves once a held firing has started
    pub async fn wait_for_firing(&self) {
        self.entered.notified().await;
    }

    pub fn release_firing(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn fire(&self, action: &TriggerAction, ctx: &FireContext) -> Result<(), ActionError> {
        self.fired.lock().push((action.clone(), ctx.clone()));
        let held = *self.hold.lock();
        if held {
            self.entered.notify_one();
            self.released.notified().await;
        }
        if *self.fail.lock() {
            return Err(ActionError::Rejected {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}
