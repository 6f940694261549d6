//! Read API over the store.
//!
//! Answers every query from the store when it can. Only a key that was
//! never fetched reaches the provider, and only once no matter how many
//! callers ask for it at the same time.

mod cloud_info;

pub use cloud_info::CachingCloudInfo;
