//! Cloud Info Core
//!
//! The cache-and-scrape engine: keeps the latest snapshot of every
//! provider's instance types and prices warm in a store, and answers reads
//! from that store without ever exposing provider latency once a key has
//! been fetched.
//!
//! # Architecture
//!
//! ```text
//! ServiceManager ──seeds catalog──► CloudInfoStore ◄──reads── CachingCloudInfo
//!                                       ▲                           │ miss
//! ScrapingDriver ──ticks──► KeyFetcher ─┘ writes                    ▼
//!       │                      │ (single-flight per key)        KeyFetcher
//!       └── publishes ──► EventBus ──► management / metrics
//! ```
//!
//! All components share one explicitly owned store instance; nothing in
//! this crate is global.

pub mod caching;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fetch;
pub mod metrics;
pub mod scraping;
pub mod services;
pub mod status;
pub mod store;

#[cfg(test)]
mod testing;

pub use caching::CachingCloudInfo;
pub use config::{EngineConfig, ProviderSettings};
pub use engine::Engine;
pub use errors::{ConfigError, Error, FetchFailure, Result, StoreError};
pub use events::{CloudInfoEvent, EventBus, EventSubscription, RefreshOutcome};
pub use fetch::{FetchCoordinator, FetchTarget, Fetched, KeyFetcher};
pub use metrics::{PassMetrics, ScrapeMetrics, ServiceMetrics};
pub use scraping::{DriverState, RenewScope, ScrapeReport, ScrapingDriver, ScrapingHandle};
pub use services::ServiceManager;
pub use status::{RefreshStatus, StatusBook};
pub use store::{
    CloudInfoStore, InMemoryStore, KeyPrefix, Namespace, PutOutcome, StoreEntry, StoreKey,
    TypedStoreExt,
};

pub use cloudinfo_provider as provider;
