//! Error types for the engine

use datawatch_core::domain::pattern::PatternError;
use datawatch_core::dto::checker::DefinitionError;
use datawatch_core::period::PeriodError;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by a storage backend existence check
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error checking '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a trigger store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("trigger {0} not found")]
    NotFound(Uuid),

    #[error("failed to (de)serialize trigger: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("trigger store error: {0}")]
    Backend(String),
}

/// Errors raised while firing a trigger action
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("action rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Errors surfaced by the engine to its callers
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("invalid time to expire: {0}")]
    Period(#[from] PeriodError),

    #[error("trigger {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(StoreError),

    #[error("unknown checker type '{0}'")]
    UnknownCheckerType(String),

    #[error("unknown storage backend type '{0}'")]
    UnknownBackendType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    /// Whether the caller supplied something invalid
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            EngineError::Pattern(_) | EngineError::Definition(_) | EngineError::Period(_)
        )
    }
}
