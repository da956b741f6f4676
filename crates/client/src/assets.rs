//! End-to-end asset query: encode, consult the cache, fetch, normalize.
//!
//! Failures come back as typed [`Error`] values; deciding whether a failure
//! ends the process is left to the caller.

use std::time::Duration;

use assetq_core::cache::{CacheGate, CacheHandle, CacheStore, RefreshDecider};
use assetq_core::{Error, FieldSet, normalize};

use crate::fofa::{AssetSource, QueryParams, SearchRequest, SearchResponse, encode_query};

/// Page sizes above this are slow enough to warrant a warning.
const LARGE_PAGE_SIZE: u32 = 100;

/// Fetch-or-reuse pipeline for one field set.
pub struct AssetQuery<S, D> {
    source: S,
    gate: CacheGate<D>,
    fields: FieldSet,
}

impl<S: AssetSource, D: RefreshDecider> AssetQuery<S, D> {
    pub fn new(source: S, gate: CacheGate<D>, fields: FieldSet) -> Self {
        Self { source, gate, fields }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &CacheStore {
        self.gate.store()
    }

    /// Return a handle to `project`'s assets, querying the API only when
    /// the cache gate does not yield reusable rows.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for project names the cache store rejects
    /// - `Error::FetchTimeout` / `Error::HttpError` on transport failure
    /// - `Error::ApiError` if the payload carries an error flag
    /// - `Error::MalformedResponse` if the payload lacks a result count
    /// - `Error::NoAssets` if the API matched nothing
    /// - cache write failures from the store
    pub async fn fetch(
        &self, project: &str, params: &QueryParams, size: u32, page: u32, timeout: Duration,
    ) -> Result<CacheHandle, Error> {
        self.gate.store().path_for(project)?;

        let query = encode_query(&self.fields, params);
        tracing::info!(project, "running asset query");
        tracing::debug!(project, query = %query.decoded(), fields = %self.fields.joined(), size, "query parameters");

        if let Some(handle) = self.gate.check(project) {
            return Ok(handle);
        }
        tracing::info!(project, "no reusable cache, querying the API");

        if size > LARGE_PAGE_SIZE {
            tracing::warn!(size, "large page requested; the query may take a while");
        }

        let request = SearchRequest::new(&query, &self.fields, size, page);
        let payload = self.source.search(&request, timeout).await.map_err(|e| {
            tracing::error!(project, error = %e, "asset query failed");
            Error::from(e)
        })?;

        let envelope = SearchResponse::from_payload(&payload)?;
        if envelope.error {
            return Err(Error::ApiError(envelope.errmsg.unwrap_or_else(|| "unknown API error".into())));
        }
        let total = envelope
            .size
            .ok_or_else(|| Error::MalformedResponse("response has no `size` field".into()))?;
        if total == 0 {
            tracing::warn!(project, "no assets matched the query");
            return Err(Error::NoAssets(query.decoded()));
        }
        tracing::info!(project, total, size, "query succeeded");

        normalize(self.gate.store(), project, payload, &self.fields)?
            .ok_or_else(|| Error::MalformedResponse("search response could not be normalized".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fofa::FofaError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays one canned result and records the requests it saw.
    struct ScriptedSource {
        reply: Mutex<Option<Result<Value, FofaError>>>,
        calls: AtomicUsize,
        last: Mutex<Option<SearchRequest>>,
    }

    impl ScriptedSource {
        fn new(reply: Result<Value, FofaError>) -> Self {
            Self { reply: Mutex::new(Some(reply)), calls: AtomicUsize::new(0), last: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl AssetSource for ScriptedSource {
        async fn search(&self, req: &SearchRequest, _timeout: Duration) -> Result<Value, FofaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(req.clone());
            self.reply.lock().unwrap().take().unwrap_or(Err(FofaError::Timeout))
        }
    }

    fn fields() -> FieldSet {
        FieldSet::new(["link", "ip", "port"]).unwrap()
    }

    fn params() -> QueryParams {
        QueryParams::new().with("domain", "example.com")
    }

    fn reuse(_: usize) -> bool {
        false
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_fetch_normalizes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(Ok(json!({
            "error": false,
            "size": 3,
            "results": [
                ["https://a.example.com", "1.1.1.1", "443"],
                ["https://b.example.com", "2.2.2.2", "80"],
                ["https://a.example.com", "1.1.1.1", "443"]
            ]
        })));
        let gate = CacheGate::new(CacheStore::new(dir.path(), "raw_assets.parquet"), reuse);
        let query = AssetQuery::new(source, gate, fields());

        let handle = query.fetch("p1", &params(), 100, 1, TIMEOUT).await.unwrap();

        assert_eq!(handle.rows, 2);
        assert!(handle.path.exists());
        assert_eq!(query.source().calls.load(Ordering::SeqCst), 1);

        let sent = query.source().last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.fields, "link,ip,port");
        assert_eq!(sent.size, 100);
        assert_eq!(sent.qbase64, encode_query(&fields(), &params()).as_str());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "raw_assets.parquet");
        normalize(&store, "p1", json!({"results": [["https://a", "1.1.1.1", "80"]]}), &fields()).unwrap();

        let source = ScriptedSource::new(Err(FofaError::Timeout));
        let query = AssetQuery::new(source, CacheGate::new(store, reuse), fields());

        let handle = query.fetch("p1", &params(), 100, 1, TIMEOUT).await.unwrap();

        assert_eq!(handle.rows, 1);
        assert_eq!(query.source().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_overwrites_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "raw_assets.parquet");
        normalize(&store, "p1", json!({"results": [["https://old", "1.1.1.1", "80"]]}), &fields()).unwrap();

        let source = ScriptedSource::new(Ok(json!({
            "size": 2,
            "results": [["https://new1", "3.3.3.3", "80"], ["https://new2", "4.4.4.4", "80"]]
        })));
        let query = AssetQuery::new(source, CacheGate::new(store, |_: usize| true), fields());

        let handle = query.fetch("p1", &params(), 10, 1, TIMEOUT).await.unwrap();

        assert_eq!(handle.rows, 2);
        assert_eq!(query.store().load("p1").unwrap().unwrap().num_rows(), 2);
    }

    #[tokio::test]
    async fn test_invalid_project_never_reaches_network() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(Ok(json!({"size": 1, "results": [["https://a", "1.1.1.1", "80"]]})));
        let gate = CacheGate::new(CacheStore::new(dir.path(), "raw_assets.parquet"), reuse);
        let query = AssetQuery::new(source, gate, fields());

        for project in ["../evil", "a/b", ""] {
            let result = query.fetch(project, &params(), 100, 1, TIMEOUT).await;
            assert!(matches!(result, Err(Error::InvalidInput(_))), "{project:?} should be rejected");
        }
        assert_eq!(query.source().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_matches_is_no_assets() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(Ok(json!({"error": false, "size": 0, "results": []})));
        let gate = CacheGate::new(CacheStore::new(dir.path(), "raw_assets.parquet"), reuse);
        let query = AssetQuery::new(source, gate, fields());

        let result = query.fetch("p1", &params(), 100, 1, TIMEOUT).await;

        assert!(matches!(result, Err(Error::NoAssets(q)) if q.contains("example.com")));
        assert!(!query.store().path_for("p1").unwrap().exists());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(Err(FofaError::Timeout));
        let gate = CacheGate::new(CacheStore::new(dir.path(), "raw_assets.parquet"), reuse);
        let query = AssetQuery::new(source, gate, fields());

        let result = query.fetch("p1", &params(), 100, 1, TIMEOUT).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }

    #[tokio::test]
    async fn test_api_error_flag() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(Ok(json!({"error": true, "errmsg": "[-700] Account Invalid"})));
        let gate = CacheGate::new(CacheStore::new(dir.path(), "raw_assets.parquet"), reuse);
        let query = AssetQuery::new(source, gate, fields());

        let result = query.fetch("p1", &params(), 100, 1, TIMEOUT).await;
        assert!(matches!(result, Err(Error::ApiError(msg)) if msg.contains("-700")));
    }

    #[tokio::test]
    async fn test_missing_size_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(Ok(json!({"results": []})));
        let gate = CacheGate::new(CacheStore::new(dir.path(), "raw_assets.parquet"), reuse);
        let query = AssetQuery::new(source, gate, fields());

        let result = query.fetch("p1", &params(), 100, 1, TIMEOUT).await;
        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }
}
