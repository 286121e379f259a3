//! Engine configuration
//!
//! Defines all operator-tunable parameters of the trigger engine: data source
//! identity, cache bounds, queue capacity, polling cadence and the storage
//! backend to poll.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use datawatch_core::period::parse_period;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Data source identifier; triggers are loaded and listed by it
    pub data_source: String,

    /// Type id the data checker is registered under
    pub checker_type: String,

    /// Maximum number of confirmed existence facts kept in memory
    pub cache_max_entries: usize,

    /// How long a confirmed existence fact stays valid
    pub cache_ttl: Duration,

    /// Maximum number of pending existence checks
    pub queue_capacity: usize,

    /// Fixed period of the poller and lifecycle loops
    pub poll_interval: Duration,

    /// Expiry applied when a create request does not give one
    pub default_time_to_expire: Duration,

    /// Storage backend type id (`local`, `memory`)
    pub storage_backend: String,

    /// Root directory for the `local` backend
    pub storage_root: PathBuf,

    /// Base URL of the flow executor; actions are only logged when unset
    pub action_url: Option<String>,
}

impl EngineConfig {
    /// Creates a configuration with defaults for the given data source
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            checker_type: "DataChecker".to_string(),
            cache_max_entries: 10_000,
            cache_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            queue_capacity: 1_000,
            poll_interval: Duration::from_secs(10),
            default_time_to_expire: Duration::from_secs(24 * 60 * 60),
            storage_backend: "local".to_string(),
            storage_root: PathBuf::from("/"),
            action_url: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Every variable is optional and falls back to the default:
    /// - DATAWATCH_DATA_SOURCE (default: hdfs)
    /// - DATAWATCH_CHECKER_TYPE (default: DataChecker)
    /// - DATAWATCH_CACHE_MAX_ENTRIES (default: 10000)
    /// - DATAWATCH_CACHE_TTL (period, default: 7d)
    /// - DATAWATCH_QUEUE_CAPACITY (default: 1000)
    /// - DATAWATCH_POLL_INTERVAL (period, default: 10s)
    /// - DATAWATCH_DEFAULT_EXPIRE (period, default: 24h)
    /// - DATAWATCH_STORAGE_BACKEND (default: local)
    /// - DATAWATCH_STORAGE_ROOT (default: /)
    /// - DATAWATCH_ACTION_URL (default: unset)
    ///
    /// A variable that is set but unparsable is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let cache_max_entries = env_parsed("DATAWATCH_CACHE_MAX_ENTRIES", |s| {
            s.parse::<usize>().map_err(anyhow::Error::from)
        })?
        .unwrap_or(defaults.cache_max_entries);

        let queue_capacity = env_parsed("DATAWATCH_QUEUE_CAPACITY", |s| {
            s.parse::<usize>().map_err(anyhow::Error::from)
        })?
        .unwrap_or(defaults.queue_capacity);

        let cache_ttl = env_period("DATAWATCH_CACHE_TTL")?.unwrap_or(defaults.cache_ttl);
        let poll_interval =
            env_period("DATAWATCH_POLL_INTERVAL")?.unwrap_or(defaults.poll_interval);
        let default_time_to_expire = env_period("DATAWATCH_DEFAULT_EXPIRE")?
            .unwrap_or(defaults.default_time_to_expire);

        Ok(Self {
            data_source: env_string("DATAWATCH_DATA_SOURCE").unwrap_or(defaults.data_source),
            checker_type: env_string("DATAWATCH_CHECKER_TYPE").unwrap_or(defaults.checker_type),
            cache_max_entries,
            cache_ttl,
            queue_capacity,
            poll_interval,
            default_time_to_expire,
            storage_backend: env_string("DATAWATCH_STORAGE_BACKEND")
                .unwrap_or(defaults.storage_backend),
            storage_root: env_string("DATAWATCH_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            action_url: env_string("DATAWATCH_ACTION_URL"),
        })
    }

    /// Sets the storage backend type id
    pub fn with_storage_backend(mut self, backend: impl Into<String>) -> Self {
        self.storage_backend = backend.into();
        self
    }

    /// Sets the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data_source.is_empty() {
            anyhow::bail!("data_source cannot be empty");
        }

        if self.checker_type.is_empty() {
            anyhow::bail!("checker_type cannot be empty");
        }

        if self.cache_max_entries == 0 {
            anyhow::bail!("cache_max_entries must be greater than 0");
        }

        if self.cache_ttl.is_zero() {
            anyhow::bail!("cache_ttl must be greater than 0");
        }

        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if let Some(url) = &self.action_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("action_url must start with http:// or https://");
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("hdfs")
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_parsed<T>(
    name: &str,
    parse: impl FnOnce(&str) -> anyhow::Result<T>,
) -> anyhow::Result<Option<T>> {
    env_string(name)
        .map(|s| parse(s.trim()).with_context(|| format!("invalid value for {}: '{}'", name, s)))
        .transpose()
}

fn env_period(name: &str) -> anyhow::Result<Option<Duration>> {
    env_parsed(name, |s| parse_period(s).map_err(anyhow::Error::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.data_source, "hdfs");
        assert_eq!(config.checker_type, "DataChecker");
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.cache_ttl, Duration::from_secs(604_800));
        assert_eq!(config.queue_capacity, 1_000);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.default_time_to_expire, Duration::from_secs(86_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.data_source = String::new();
        assert!(config.validate().is_err());
        config.data_source = "hdfs".to_string();

        config.queue_capacity = 0;
        assert!(config.validate().is_err());
        config.queue_capacity = 10;

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_interval = Duration::from_millis(50);

        config.action_url = Some("not-a-url".to_string());
        assert!(config.validate().is_err());

        config.action_url = Some("http://localhost:8081".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new("s3")
            .with_storage_backend("memory")
            .with_poll_interval(Duration::from_millis(20));
        assert_eq!(config.data_source, "s3");
        assert_eq!(config.storage_backend, "memory");
        assert_eq!(config.poll_interval, Duration::from_millis(20));
    }
}
