//! Fetching a single key from its provider into the store.
//!
//! Both the scraping driver and the caching facade go through
//! [`KeyFetcher`], which guarantees at most one upstream fetch per key at
//! any moment.

mod fetcher;
mod single_flight;
mod target;

pub use fetcher::{Fetched, KeyFetcher};
pub use single_flight::FetchCoordinator;
pub use target::FetchTarget;
