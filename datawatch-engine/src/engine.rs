//! Engine construction
//!
//! The engine is built once at process start and handed to whatever needs it.
//! Starting it spawns the single existence poller and the trigger lifecycle
//! loop; shutting it down cancels both and waits for them.

use std::sync::Arc;

use datawatch_core::dto::trigger::CheckerStatus;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::repository::{ActionExecutor, StorageBackend, TriggerStore};
use crate::scheduler::PollingScheduler;
use crate::service::{CheckerRegistry, DataChecker, ExistenceCache, TriggerManager};

/// Handle to a running engine
pub struct Engine {
    config: EngineConfig,
    scheduler: Arc<PollingScheduler>,
    manager: Arc<TriggerManager>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Builds every component, arms stored triggers, and starts both loops
    ///
    /// Fails without spawning anything if the configuration is invalid or the
    /// stored triggers cannot be listed.
    pub async fn start(
        config: EngineConfig,
        backend: Arc<dyn StorageBackend>,
        store: Arc<dyn TriggerStore>,
        executor: Arc<dyn ActionExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let cache = Arc::new(ExistenceCache::new(
            config.cache_max_entries,
            config.cache_ttl,
            Arc::clone(&clock),
        ));
        let (scheduler, poller) = PollingScheduler::new(
            cache,
            backend,
            config.queue_capacity,
            config.poll_interval,
        );

        let mut registry = CheckerRegistry::new();
        DataChecker::register(&mut registry, &config.checker_type, Arc::clone(&scheduler));

        let manager = Arc::new(TriggerManager::new(
            &config,
            Arc::new(registry),
            store,
            executor,
            clock,
        ));
        manager.load().await?;

        let cancel = CancellationToken::new();
        let poller_task = tokio::spawn(poller.run(cancel.child_token()));
        let lifecycle_task = tokio::spawn(
            Arc::clone(&manager).run(config.poll_interval, cancel.child_token()),
        );

        info!(
            "Engine started for data source '{}' (checker type '{}')",
            config.data_source, config.checker_type
        );

        Ok(Self {
            config,
            scheduler,
            manager,
            cancel,
            tasks: Mutex::new(vec![poller_task, lifecycle_task]),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<TriggerManager> {
        &self.manager
    }

    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.scheduler
    }

    pub fn status(&self) -> CheckerStatus {
        CheckerStatus {
            cached_entries: self.scheduler.cache().len(),
            pending_checks: self.scheduler.pending_len(),
            armed_triggers: self.manager.armed_count(),
        }
    }

    /// Stops both loops and waits for them to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Engine task ended abnormally: {}", e);
            }
        }
        info!("Engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::repository::{InMemoryTriggerStore, MemoryBackend};
    use crate::test_support::{RecordingExecutor, ScriptedBackend, SlowBackend};
    use datawatch_core::domain::check_key::CheckKey;
    use datawatch_core::domain::pattern::PathPattern;
    use datawatch_core::domain::trigger::Recurrence;
    use datawatch_core::domain::variable::{Variable, VariableSet};
    use datawatch_core::dto::trigger::CreateTrigger;
    use std::time::{Duration, Instant};

    fn fast_config() -> EngineConfig {
        EngineConfig::default()
            .with_storage_backend("memory")
            .with_poll_interval(Duration::from_millis(20))
    }

    fn request(patterns: &[&str], expire: &str) -> CreateTrigger {
        CreateTrigger {
            path_patterns: patterns.iter().map(|p| PathPattern::new(*p)).collect(),
            principal: "etl".to_string(),
            variables: VariableSet::new().with("YEAR", Variable::fixed(2024)),
            time_to_expire: Some(expire.to_string()),
            project_id: 1,
            flow_name: "ingest".to_string(),
            webhook_url: None,
            recurrence: Recurrence::Once,
            submit_user: "azkaban".to_string(),
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let mut config = fast_config();
        config.queue_capacity = 0;
        let result = Engine::start(
            config,
            Arc::new(MemoryBackend::new()),
            Arc::new(InMemoryTriggerStore::new()),
            Arc::new(RecordingExecutor::new()),
            Arc::new(SystemClock),
        )
        .await;
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_trigger_fires_once_data_appears() {
        let backend = Arc::new(ScriptedBackend::new());
        let executor = Arc::new(RecordingExecutor::new());
        let engine = Engine::start(
            fast_config(),
            backend.clone(),
            Arc::new(InMemoryTriggerStore::new()),
            executor.clone(),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();

        let trigger = engine
            .manager()
            .create_trigger(request(&["/a/${YEAR}"], "1h"))
            .await
            .unwrap();

        // the backend has been asked and said no
        assert!(wait_until(|| !backend.calls().is_empty()).await);
        assert!(executor.fired().is_empty());

        backend.set("/a/2024", true);
        assert!(wait_until(|| executor.fired().len() == 1).await);
        assert_eq!(executor.fired()[0].1.trigger_id, trigger.id);
        assert!(wait_until(|| engine.status().armed_triggers == 0).await);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_multi_pattern_waits_for_every_path() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add("/a", "etl");
        let executor = Arc::new(RecordingExecutor::new());
        let engine = Engine::start(
            fast_config(),
            backend.clone(),
            Arc::new(InMemoryTriggerStore::new()),
            executor.clone(),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();

        engine
            .manager()
            .create_trigger(request(&["/a", "/b"], "1h"))
            .await
            .unwrap();

        let a = CheckKey::new("/a", "etl");
        assert!(wait_until(|| engine.scheduler().cache().get(&a)).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(executor.fired().is_empty());

        backend.add("/b", "etl");
        assert!(wait_until(|| executor.fired().len() == 1).await);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_is_not_blocked_by_slow_backend() {
        let backend = Arc::new(SlowBackend::new(Duration::from_millis(500)));
        let engine = Engine::start(
            fast_config(),
            backend.clone(),
            Arc::new(InMemoryTriggerStore::new()),
            Arc::new(RecordingExecutor::new()),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();

        engine
            .manager()
            .create_trigger(request(&["/slow"], "1h"))
            .await
            .unwrap();
        backend.wait_for_call().await;

        let started = Instant::now();
        let trigger = engine
            .manager()
            .create_trigger(request(&["/other"], "1h"))
            .await
            .unwrap();
        let report = engine.manager().run_cycle().await;
        assert!(started.elapsed() < Duration::from_millis(200));
        assert!(report.pending >= 1);
        assert!(engine.manager().get_trigger(trigger.id).is_ok());

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_polling() {
        let backend = Arc::new(ScriptedBackend::new());
        let engine = Engine::start(
            fast_config(),
            backend.clone(),
            Arc::new(InMemoryTriggerStore::new()),
            Arc::new(RecordingExecutor::new()),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();
        engine
            .manager()
            .create_trigger(request(&["/never"], "1h"))
            .await
            .unwrap();
        assert!(wait_until(|| !backend.calls().is_empty()).await);

        engine.shutdown().await;
        let calls = backend.calls().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.calls().len(), calls);
    }
}
