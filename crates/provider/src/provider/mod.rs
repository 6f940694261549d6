//! Cloud provider abstractions and implementations.
//!
//! This module contains:
//! - The `CloudInfoProvider` trait that every cloud vendor implements
//! - Fetch limits (concurrency ceiling, request rate, timeout)
//! - The snapshot provider, which serves data from a JSON file
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: The engine only sees the trait, never a concrete vendor
//! - **Selected by configuration**: Vendors are registered at startup, never discovered at runtime
//! - **Bounded**: Every call goes through the registry, which enforces the limits

mod limits;
mod traits;

pub mod snapshot;

pub use limits::FetchLimits;
pub use traits::CloudInfoProvider;
