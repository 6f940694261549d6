//! Cloud Info Provider Crate
//!
//! This crate defines the provider-agnostic contract the cache-and-scrape
//! engine uses to talk to cloud vendors, together with the call gating that
//! keeps those calls inside each vendor's limits.
//!
//! # Overview
//!
//! - Common data model for services, regions, zones, instance types and prices
//! - The [`CloudInfoProvider`] trait, one implementation per cloud vendor
//! - [`ProviderRegistry`]: concurrency ceilings, rate limiting and per-fetch timeouts
//! - [`SnapshotProvider`]: a provider served from a JSON snapshot file
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  cloudinfo-core  |  (scraping driver, caching facade)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | ProviderRegistry |  (semaphore + token bucket + timeout)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (amazon, google, snapshot, ...)
//! +------------------+
//! ```

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::{ProviderError, ProviderErrorKind};
pub use models::{
    Attributes, InstanceType, Price, PriceModel, ProviderId, Region, Service, Zone,
};
pub use provider::snapshot::{SnapshotDocument, SnapshotProvider};
pub use provider::{CloudInfoProvider, FetchLimits};
pub use registry::{ProviderRegistry, RateLimiter};
