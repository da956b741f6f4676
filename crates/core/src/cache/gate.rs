//! Reuse-or-refetch decision for a project's cached assets.
//!
//! | cache state             | outcome                                  |
//! |-------------------------|------------------------------------------|
//! | no file                 | miss                                     |
//! | file with zero rows     | miss (created but never filled)          |
//! | unreadable file         | miss, error logged                       |
//! | file with rows          | ask the [`RefreshDecider`]; yes → miss   |
//!
//! A miss never deletes the existing file; the next successful query
//! overwrites it.

use super::store::{CacheHandle, CacheStore};

/// Decides whether a non-empty cache should be discarded in favour of a
/// fresh query.
pub trait RefreshDecider {
    /// `true` to re-run the query, `false` to reuse the cached rows.
    fn should_refresh(&self, existing_rows: usize) -> bool;
}

impl<F> RefreshDecider for F
where
    F: Fn(usize) -> bool,
{
    fn should_refresh(&self, existing_rows: usize) -> bool {
        self(existing_rows)
    }
}

/// Cache lookup with a pluggable refresh decision.
#[derive(Debug, Clone)]
pub struct CacheGate<D> {
    store: CacheStore,
    decider: D,
}

impl<D: RefreshDecider> CacheGate<D> {
    pub fn new(store: CacheStore, decider: D) -> Self {
        Self { store, decider }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Return a handle to reusable cached assets, or `None` when the caller
    /// must query the API.
    pub fn check(&self, project: &str) -> Option<CacheHandle> {
        tracing::debug!(project, "checking asset cache");

        let table = match self.store.load(project) {
            Ok(Some(table)) => table,
            Ok(None) => {
                tracing::debug!(project, "no asset cache");
                return None;
            }
            Err(e) => {
                tracing::error!(project, error = %e, "failed to read asset cache");
                return None;
            }
        };

        let rows = table.num_rows();
        if rows == 0 {
            tracing::debug!(project, "asset cache exists but is empty");
            return None;
        }

        if self.decider.should_refresh(rows) {
            tracing::info!(project, rows, "refreshing cached assets");
            return None;
        }

        match self.store.handle(project, rows) {
            Ok(handle) => {
                tracing::info!(project, rows, "reusing cached assets");
                Some(handle)
            }
            Err(e) => {
                tracing::error!(project, error = %e, "failed to resolve asset cache path");
                None
            }
        }
    }
}
