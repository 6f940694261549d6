//! Periodic refresh of everything in the service catalog.
//!
//! This module provides:
//! - [`ScrapingDriver`]: schedules passes on a fixed interval and on demand
//! - [`RenewScope`]: what an on-demand renewal covers
//! - [`ScrapeReport`]: per-pair outcomes of one pass

mod driver;
mod report;
mod scope;
mod task;

pub use driver::{DriverState, ScrapingDriver, ScrapingHandle};
pub use report::{PairOutcome, ScrapeReport};
pub use scope::RenewScope;
