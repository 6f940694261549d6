use std::fmt;

use serde::{Deserialize, Serialize};

/// Part of the catalog an on-demand renewal refreshes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RenewScope {
    All,
    Provider { provider: String },
    Service { provider: String, service: String },
}

impl RenewScope {
    pub fn provider(provider: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
        }
    }

    pub fn service(provider: impl Into<String>, service: impl Into<String>) -> Self {
        Self::Service {
            provider: provider.into(),
            service: service.into(),
        }
    }

    pub fn matches(&self, provider: &str, service: &str) -> bool {
        match self {
            Self::All => true,
            Self::Provider { provider: p } => p == provider,
            Self::Service {
                provider: p,
                service: s,
            } => p == provider && s == service,
        }
    }

    /// Whether refreshing `self` also refreshes everything in `other`.
    pub fn covers(&self, other: &RenewScope) -> bool {
        match (self, other) {
            (Self::All, _) => true,
            (Self::Provider { provider }, Self::Provider { provider: other }) => provider == other,
            (Self::Provider { provider }, Self::Service { provider: other, .. }) => {
                provider == other
            }
            (Self::Service { .. }, Self::Service { .. }) => self == other,
            _ => false,
        }
    }
}

impl fmt::Display for RenewScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Provider { provider } => f.write_str(provider),
            Self::Service { provider, service } => write!(f, "{}/{}", provider, service),
        }
    }
}

/// Pending renewals, coalesced so that no queued scope covers another.
#[derive(Debug, Default)]
pub(crate) struct RenewQueue {
    pending: Vec<RenewScope>,
}

impl RenewQueue {
    /// Queues `scope`. Returns false when an already queued scope covers it.
    pub fn push(&mut self, scope: RenewScope) -> bool {
        if self.pending.iter().any(|queued| queued.covers(&scope)) {
            return false;
        }
        self.pending.retain(|queued| !scope.covers(queued));
        self.pending.push(scope);
        true
    }

    pub fn drain(&mut self) -> Vec<RenewScope> {
        std::mem::take(&mut self.pending)
    }
}
