//! Cloud info models
//!
//! This module contains the data types exchanged with providers:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `catalog` - Services, regions and zones of a provider
//! - `instance` - Instance types and their attribute maps
//! - `price` - Prices and pricing models

mod catalog;
mod instance;
mod price;
mod types;

pub use catalog::{Region, Service, Zone};
pub use instance::{Attributes, InstanceType, ATTR_CPU, ATTR_GPU, ATTR_MEMORY, ATTR_NETWORK};
pub use price::{Price, PriceModel};
pub use types::ProviderId;
