//! Storage backends
//!
//! The external system whose contents the triggers wait on. Only the poller
//! calls into a backend; everything else reads the existence cache.
//!
//! Backends are selected by a type id from configuration through
//! `BackendRegistry`, which is populated by explicit registration.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use datawatch_core::domain::check_key::CheckKey;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, StorageError};

/// Backend answering existence checks
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Checks whether `path` exists when accessed as `principal`
    async fn exists(&self, path: &str, principal: &str) -> Result<bool, StorageError>;
}

/// Local filesystem backend
///
/// Paths are resolved under `root`; `..` and other non-normal components are
/// ignored so a pattern cannot escape the root.
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

#[async_trait]
impl StorageBackend for LocalFsBackend {
    async fn exists(&self, path: &str, principal: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path);
        debug!("Checking {} as {}", full.display(), principal);
        tokio::fs::try_exists(&full)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_string(),
                source,
            })
    }
}

/// In-memory backend holding a settable set of existing paths
#[derive(Default)]
pub struct MemoryBackend {
    existing: RwLock<HashSet<CheckKey>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` as existing for `principal`
    pub fn add(&self, path: impl Into<String>, principal: impl Into<String>) {
        self.existing.write().insert(CheckKey::new(path, principal));
    }

    pub fn remove(&self, path: &str, principal: &str) {
        self.existing.write().remove(&CheckKey::new(path, principal));
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn exists(&self, path: &str, principal: &str) -> Result<bool, StorageError> {
        Ok(self
            .existing
            .read()
            .contains(&CheckKey::new(path, principal)))
    }
}

/// Constructor for a storage backend from engine configuration
pub type BackendFactory =
    Box<dyn Fn(&EngineConfig) -> Result<Arc<dyn StorageBackend>, EngineError> + Send + Sync>;

/// Storage backends keyed by type id
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in `local` and `memory` backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "local",
            Box::new(|config: &EngineConfig| {
                if !config.storage_root.is_dir() {
                    return Err(EngineError::InvalidConfig(format!(
                        "storage root {} is not a directory",
                        config.storage_root.display()
                    )));
                }
                Ok(Arc::new(LocalFsBackend::new(config.storage_root.clone()))
                    as Arc<dyn StorageBackend>)
            }),
        );
        registry.register(
            "memory",
            Box::new(|_: &EngineConfig| {
                Ok(Arc::new(MemoryBackend::new()) as Arc<dyn StorageBackend>)
            }),
        );
        registry
    }

    pub fn register(&mut self, type_id: impl Into<String>, factory: BackendFactory) {
        self.factories.insert(type_id.into(), factory);
    }

    /// Builds the backend named by `config.storage_backend`
    pub fn create(&self, config: &EngineConfig) -> Result<Arc<dyn StorageBackend>, EngineError> {
        let factory = self
            .factories
            .get(&config.storage_backend)
            .ok_or_else(|| EngineError::UnknownBackendType(config.storage_backend.clone()))?;
        let backend = factory(config)?;
        info!("Initialized '{}' storage backend", config.storage_backend);
        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_backend_checks_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data/2024/6")).unwrap();
        std::fs::write(dir.path().join("data/2024/6/_SUCCESS"), b"").unwrap();

        let backend = LocalFsBackend::new(dir.path());
        assert!(backend.exists("/data/2024/6", "etl").await.unwrap());
        assert!(backend.exists("/data/2024/6/_SUCCESS", "etl").await.unwrap());
        assert!(!backend.exists("/data/2024/7", "etl").await.unwrap());
    }

    #[test]
    fn test_local_backend_ignores_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("inside")).unwrap();

        let backend = LocalFsBackend::new(dir.path().join("inside"));
        assert_eq!(
            backend.resolve("/../../etc/passwd"),
            dir.path().join("inside/etc/passwd")
        );
    }

    #[tokio::test]
    async fn test_memory_backend_is_principal_aware() {
        let backend = MemoryBackend::new();
        backend.add("/a", "etl");
        assert!(backend.exists("/a", "etl").await.unwrap());
        assert!(!backend.exists("/a", "guest").await.unwrap());

        backend.remove("/a", "etl");
        assert!(!backend.exists("/a", "etl").await.unwrap());
    }

    #[test]
    fn test_registry_rejects_unknown_type() {
        let registry = BackendRegistry::with_defaults();
        let config = EngineConfig::default().with_storage_backend("webhdfs");
        assert!(matches!(
            registry.create(&config),
            Err(EngineError::UnknownBackendType(t)) if t == "webhdfs"
        ));
    }

    #[test]
    fn test_registry_local_requires_directory_root() {
        let registry = BackendRegistry::with_defaults();
        let mut config = EngineConfig::default();
        config.storage_root = PathBuf::from("/definitely/not/here");
        assert!(matches!(
            registry.create(&config),
            Err(EngineError::InvalidConfig(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        config.storage_root = dir.path().to_path_buf();
        assert!(registry.create(&config).is_ok());
    }

    #[test]
    fn test_registry_accepts_custom_backends() {
        let mut registry = BackendRegistry::new();
        registry.register(
            "custom",
            Box::new(|_: &EngineConfig| {
                Ok(Arc::new(MemoryBackend::new()) as Arc<dyn StorageBackend>)
            }),
        );
        let config = EngineConfig::default().with_storage_backend("custom");
        assert!(registry.create(&config).is_ok());
        assert!(
            registry
                .create(&EngineConfig::default().with_storage_backend("memory"))
                .is_err()
        );
    }
}
