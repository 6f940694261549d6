//! Error types for provider calls.
//!
//! This module provides:
//! - [`ProviderError`]: The error enum returned by every provider operation
//! - [`ProviderErrorKind`]: A coarse classification used for logging and status bookkeeping

mod kind;

pub use kind::ProviderErrorKind;

use thiserror::Error;

/// Errors that can occur while calling a cloud provider.
///
/// The engine treats every variant the same way ("this key's refresh
/// failed"); the [`kind`](Self::kind) only feeds logs and refresh status.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The requested region, zone, instance type or price does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider does not implement the operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The provider that rejected it
        provider: String,
    },

    /// The provider rate limited the request.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The call did not complete within the configured fetch timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Credentials were missing or rejected.
    #[error("Unauthorized: {provider} - {message}")]
    Unauthorized {
        /// The provider that rejected the credentials
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// Transport-level failure talking to the provider.
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider that could not be reached
        provider: String,
        /// Description of the failure
        message: String,
    },

    /// Any other provider-side failure.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// No provider with this identifier is registered.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// A snapshot file could not be read.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be parsed.
    #[error("Snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ProviderError {
    /// Returns the classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use cloudinfo_provider::errors::{ProviderError, ProviderErrorKind};
    ///
    /// let error = ProviderError::Timeout { provider: "amazon".to_string() };
    /// assert_eq!(error.kind(), ProviderErrorKind::Timeout);
    /// ```
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::NotFound(_) => ProviderErrorKind::NotFound,
            Self::NotSupported { .. } => ProviderErrorKind::NotSupported,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimited,
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::Unauthorized { .. } => ProviderErrorKind::Unauthorized,
            Self::Network { .. } => ProviderErrorKind::Network,
            Self::ProviderError { .. } => ProviderErrorKind::Provider,
            Self::UnknownProvider(_) | Self::Io(_) | Self::Parse(_) => {
                ProviderErrorKind::Configuration
            }
        }
    }

    /// Shorthand for a [`ProviderError::NotSupported`] error.
    pub fn not_supported(provider: &str, operation: &str) -> Self {
        Self::NotSupported {
            operation: operation.to_string(),
            provider: provider.to_string(),
        }
    }
}
