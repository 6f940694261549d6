//! In-process notifications about engine activity.
//!
//! This module provides:
//! - [`CloudInfoEvent`]: the facts the engine announces
//! - [`EventBus`]: a broadcast bus fanning events out to subscribers

mod bus;
mod event;

pub use bus::{EventBus, EventSubscription};
pub use event::{CloudInfoEvent, RefreshOutcome};
