use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How an instance is billed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceModel {
    OnDemand,
    /// Spot or preemptible capacity; priced per zone.
    Spot,
}

impl PriceModel {
    pub const ALL: [PriceModel; 2] = [PriceModel::OnDemand, PriceModel::Spot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnDemand => "on_demand",
            Self::Spot => "spot",
        }
    }
}

impl std::fmt::Display for PriceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PriceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_demand" | "ondemand" | "on-demand" => Ok(Self::OnDemand),
            "spot" | "preemptible" => Ok(Self::Spot),
            other => Err(format!("unknown price model: {}", other)),
        }
    }
}

/// Hourly price of an instance type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub model: PriceModel,
    pub value: Decimal,
    /// ISO 4217 code, e.g. `USD`.
    pub currency: String,
    /// When the provider last observed this price, if it reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl Price {
    pub fn new(model: PriceModel, value: Decimal, currency: impl Into<String>) -> Self {
        Self {
            model,
            value,
            currency: currency.into(),
            observed_at: None,
        }
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }
}
