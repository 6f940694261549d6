//! Service bootstrapping.
//!
//! Loads each provider's service catalog once at startup. The catalog is
//! what the scraping driver enumerates; a provider without one is never
//! scraped.

mod catalog;
mod manager;

pub use catalog::ServiceCatalog;
pub use manager::ServiceManager;
