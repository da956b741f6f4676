//! Per-project on-disk cache of normalized asset tables.
//!
//! This module provides:
//!
//! - Parquet storage keyed by project name ([`CacheStore`])
//! - The reuse-or-refetch decision ([`CacheGate`], [`RefreshDecider`])

pub mod gate;
pub mod store;

pub use crate::Error;

pub use gate::{CacheGate, RefreshDecider};
pub use store::{CacheHandle, CacheStore};
