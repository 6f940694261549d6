//! Core error types for the cloud info engine.
//!
//! Per-key fetch failures are absorbed at the scrape task boundary and only
//! reach callers of the caching facade, as [`Error::Unavailable`].

use cloudinfo_provider::{ProviderError, ProviderErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The key has never been fetched successfully and filling it failed.
    #[error("Data unavailable for {key}: {reason}")]
    Unavailable { key: String, reason: FetchFailure },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable { .. })
    }
}

/// Errors raised by a [`CloudInfoStore`](crate::store::CloudInfoStore) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store is closed")]
    Closed,

    /// The backing service is unreachable or rejected the operation.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Configuration rejected at startup, before the driver begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Scrape interval must be greater than zero")]
    ZeroInterval,

    #[error("Event bus capacity must be greater than zero")]
    ZeroEventCapacity,

    #[error("Provider '{0}': concurrency ceiling must be greater than zero")]
    ZeroConcurrency(String),

    #[error("Provider '{0}': fetch timeout must be greater than zero")]
    ZeroTimeout(String),

    #[error("Provider '{0}': requests per minute must be greater than zero")]
    ZeroRate(String),

    #[error("Provider '{0}': {1}")]
    Provider(String, String),
}

/// Cloneable summary of a failed fetch.
///
/// Single-flight waiters all receive the same failure, and refresh statuses
/// persist it, so it carries only the classification and the message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchFailure {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Missing upstream entries are expected during scraping (no spot price
    /// for a type, no zones for a region) and are not task failures.
    pub fn is_absent(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::NotFound | ProviderErrorKind::NotSupported
        )
    }
}

impl From<ProviderError> for FetchFailure {
    fn from(error: ProviderError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for FetchFailure {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::new(
            ProviderErrorKind::Provider,
            format!("fetch task aborted: {}", error),
        )
    }
}

impl From<serde_json::Error> for FetchFailure {
    fn from(error: serde_json::Error) -> Self {
        Self::new(
            ProviderErrorKind::Provider,
            format!("invalid payload: {}", error),
        )
    }
}
