use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::RenewScope;
use crate::events::RefreshOutcome;

/// Outcome of one (provider, service) refresh task.
#[derive(Clone, Debug, PartialEq)]
pub struct PairOutcome {
    pub provider: String,
    pub service: String,
    pub outcome: RefreshOutcome,
}

/// Summary of a scrape pass.
#[derive(Clone, Debug)]
pub struct ScrapeReport {
    pub pass_id: Uuid,
    pub scope: RenewScope,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<PairOutcome>,
}

impl ScrapeReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome(&self, provider: &str, service: &str) -> Option<&RefreshOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.provider == provider && o.service == service)
            .map(|o| &o.outcome)
    }
}
