//! Event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FetchFailure;

/// Result of refreshing one (provider, service) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Success {
        /// Keys written during the refresh.
        keys: usize,
    },
    Failure {
        reason: FetchFailure,
    },
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Facts published by the engine.
///
/// Delivery is best effort: a subscriber that falls behind loses the
/// oldest events it has not read yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudInfoEvent {
    /// A provider's service catalog was loaded at startup.
    ServicesLoaded {
        provider: String,
        services: Vec<String>,
    },

    /// A provider's service catalog could not be loaded; the provider is
    /// left out of scraping until restart.
    ServicesLoadFailed {
        provider: String,
        reason: FetchFailure,
    },

    /// A refresh task for one (provider, service) pair finished.
    ServiceRefreshed {
        pass_id: Uuid,
        provider: String,
        service: String,
        outcome: RefreshOutcome,
        finished_at: DateTime<Utc>,
    },

    /// Every task of a scrape pass finished.
    ScrapeCompleted {
        pass_id: Uuid,
        succeeded: usize,
        failed: usize,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
}

impl CloudInfoEvent {
    pub fn services_loaded(provider: impl Into<String>, services: Vec<String>) -> Self {
        Self::ServicesLoaded {
            provider: provider.into(),
            services,
        }
    }

    pub fn services_load_failed(provider: impl Into<String>, reason: FetchFailure) -> Self {
        Self::ServicesLoadFailed {
            provider: provider.into(),
            reason,
        }
    }

    pub fn service_refreshed(
        pass_id: Uuid,
        provider: impl Into<String>,
        service: impl Into<String>,
        outcome: RefreshOutcome,
    ) -> Self {
        Self::ServiceRefreshed {
            pass_id,
            provider: provider.into(),
            service: service.into(),
            outcome,
            finished_at: Utc::now(),
        }
    }

    /// Provider the event is about, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ServicesLoaded { provider, .. }
            | Self::ServicesLoadFailed { provider, .. }
            | Self::ServiceRefreshed { provider, .. } => Some(provider),
            Self::ScrapeCompleted { .. } => None,
        }
    }
}
