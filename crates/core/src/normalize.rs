//! Normalization of raw search results into the canonical asset table.
//!
//! Each result row is a positional tuple aligned with the [`FieldSet`].
//! The table gets one column per field plus a synthesized `is_alive`
//! column, and is deduplicated on `link` keeping the first occurrence.

use std::collections::HashSet;

use arrow::array::RecordBatch;
use serde_json::Value;

use crate::cache::{CacheHandle, CacheStore};
use crate::table::batch_from_columns;
use crate::{Error, FieldSet};

/// Column every asset table is deduplicated on.
pub const LINK_FIELD: &str = "link";

/// Synthesized liveness column appended after the requested fields.
pub const ALIVE_FIELD: &str = "is_alive";

/// A search API result, either decoded or as the raw JSON body.
#[derive(Debug, Clone)]
pub enum RawResponse {
    Json(Value),
    Text(String),
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        RawResponse::Json(value)
    }
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        RawResponse::Text(text)
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        RawResponse::Text(text.to_string())
    }
}

impl RawResponse {
    /// The response as a JSON object, if it is one.
    fn into_object(self) -> Option<serde_json::Map<String, Value>> {
        let value = match self {
            RawResponse::Json(value) => value,
            RawResponse::Text(text) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "search response is not valid JSON");
                    return None;
                }
            },
        };
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Build the canonical asset table from a raw response.
///
/// Returns `Ok(None)` when the response is not a JSON object or carries a
/// true `error` flag.
pub fn normalize_rows(raw: impl Into<RawResponse>, fields: &FieldSet) -> Result<Option<RecordBatch>, Error> {
    let Some(mut response) = raw.into().into_object() else {
        return Ok(None);
    };
    if response.get("error").and_then(Value::as_bool).unwrap_or(false) {
        let errmsg = response.get("errmsg").and_then(Value::as_str).unwrap_or_default();
        tracing::warn!(errmsg, "search response carries an error flag");
        return Ok(None);
    }

    let rows = match response.remove("results") {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    };

    let link_idx = fields.iter().position(|f| f == LINK_FIELD);
    if link_idx.is_none() {
        tracing::warn!(fields = %fields.joined(), "no `link` field; skipping deduplication");
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); fields.len()];
    let mut seen_links: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut duplicates = 0_usize;

    for row in rows {
        let values = match row {
            Value::Array(values) => values,
            other => vec![other],
        };

        if let Some(idx) = link_idx {
            let link = values.get(idx).map(Value::to_string).unwrap_or_else(|| Value::Null.to_string());
            if !seen_links.insert(link) {
                duplicates += 1;
                continue;
            }
        }

        let mut values = values.into_iter();
        for column in columns.iter_mut() {
            column.push(values.next().unwrap_or(Value::Null));
        }
    }

    let row_count = columns.first().map(Vec::len).unwrap_or(0);
    let mut named: Vec<(String, Vec<Value>)> =
        fields.iter().map(str::to_string).zip(columns).collect();
    named.push((ALIVE_FIELD.to_string(), vec![Value::Bool(true); row_count]));

    if duplicates > 0 {
        tracing::debug!(duplicates, "dropped duplicate links");
    }

    batch_from_columns(named).map(Some)
}

/// Normalize a raw response and persist it as `project`'s asset cache.
///
/// Returns `Ok(None)` under the same conditions as [`normalize_rows`]; the
/// cache is left untouched in that case.
pub fn normalize(
    store: &CacheStore, project: &str, raw: impl Into<RawResponse>, fields: &FieldSet,
) -> Result<Option<CacheHandle>, Error> {
    let Some(table) = normalize_rows(raw, fields)? else {
        return Ok(None);
    };
    let handle = store.save(project, &table)?;
    tracing::info!(project, rows = handle.rows, path = %handle.path.display(), "cached normalized assets");
    Ok(Some(handle))
}
