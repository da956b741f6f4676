//! Core types and shared functionality for assetq.
//!
//! This crate provides:
//! - Columnar asset tables and the schema-reconciling merge
//! - Normalization of raw search results
//! - Parquet-backed per-project cache with a reuse-or-refetch gate
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fields;
pub mod normalize;
pub mod table;

pub use cache::{CacheGate, CacheHandle, CacheStore, RefreshDecider};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use fields::FieldSet;
pub use normalize::{RawResponse, normalize, normalize_rows};
pub use table::{MergeMode, Tabular, merge_tables, merge_tables_with};
