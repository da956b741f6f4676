//! Columnar asset tables backed by Arrow record batches.
//!
//! JSON values coming back from the search API are loosely typed, so each
//! column's Arrow type is inferred from the values it holds:
//!
//! - all null → `Utf8`
//! - all booleans → `Boolean`
//! - all integers → `Int64`
//! - all numbers → `Float64`
//! - anything else → `Utf8` (non-string values rendered as JSON text)
//!
//! Every field is nullable.

pub mod merge;

pub use merge::{MergeMode, merge_tables, merge_tables_with};

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde_json::Value;

use crate::Error;

/// A named column of raw JSON values.
pub type JsonColumn = (String, Vec<Value>);

/// One of the tabular representations accepted by the merger.
#[derive(Debug, Clone)]
pub enum Tabular {
    /// Already columnar.
    Arrow(RecordBatch),
    /// Column-oriented (`{"col": [..]}`) or row-oriented (`[{"col": v}, ..]`) JSON.
    Json(Value),
}

impl From<RecordBatch> for Tabular {
    fn from(batch: RecordBatch) -> Self {
        Tabular::Arrow(batch)
    }
}

impl From<Value> for Tabular {
    fn from(value: Value) -> Self {
        Tabular::Json(value)
    }
}

impl Tabular {
    /// Normalize to a record batch.
    ///
    /// # Errors
    ///
    /// Returns `Error::TypeMismatch` when the JSON is neither a map of
    /// equal-length arrays nor an array of objects.
    pub fn into_batch(self) -> Result<RecordBatch, Error> {
        match self {
            Tabular::Arrow(batch) => Ok(batch),
            Tabular::Json(Value::Object(map)) => {
                let mut columns = Vec::with_capacity(map.len());
                for (name, values) in map {
                    match values {
                        Value::Array(values) => columns.push((name, values)),
                        other => {
                            return Err(Error::TypeMismatch(format!(
                                "column `{name}` must be an array, got {}",
                                json_kind(&other)
                            )));
                        }
                    }
                }
                if let Some((first, rest)) = columns.split_first()
                    && let Some((name, values)) = rest.iter().find(|(_, v)| v.len() != first.1.len())
                {
                    return Err(Error::TypeMismatch(format!(
                        "column `{name}` has {} rows, expected {}",
                        values.len(),
                        first.1.len()
                    )));
                }
                batch_from_columns(columns)
            }
            Tabular::Json(Value::Array(rows)) => batch_from_records(rows),
            Tabular::Json(other) => {
                Err(Error::TypeMismatch(format!("expected a table, got a JSON {}", json_kind(&other))))
            }
        }
    }
}

/// Build a record batch from ordered named columns of JSON values.
///
/// All columns must have the same length.
pub fn batch_from_columns(columns: Vec<JsonColumn>) -> Result<RecordBatch, Error> {
    let row_count = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());

    for (name, values) in columns {
        let array = json_to_array(&values);
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(row_count));
    Ok(RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?)
}

/// Build a record batch from row objects.
///
/// Column order follows first appearance of each key; keys missing from a
/// row become nulls.
fn batch_from_records(rows: Vec<Value>) -> Result<RecordBatch, Error> {
    let mut names: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(rows.len());

    for (idx, row) in rows.into_iter().enumerate() {
        let Value::Object(object) = row else {
            return Err(Error::TypeMismatch(format!("row {idx} is a JSON {}, expected an object", json_kind(&row))));
        };
        for key in object.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
        objects.push(object);
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let values = objects.iter().map(|o| o.get(&name).cloned().unwrap_or(Value::Null)).collect();
            (name, values)
        })
        .collect();

    batch_from_columns(columns)
}

/// Infer the Arrow type for a column of JSON values.
pub fn infer_type(values: &[Value]) -> DataType {
    let mut present = values.iter().filter(|v| !v.is_null()).peekable();
    if present.peek().is_none() {
        return DataType::Utf8;
    }
    let present: Vec<&Value> = present.collect();

    if present.iter().all(|v| v.is_boolean()) {
        DataType::Boolean
    } else if present.iter().all(|v| v.is_i64()) {
        DataType::Int64
    } else if present.iter().all(|v| v.is_number()) {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn json_to_array(values: &[Value]) -> ArrayRef {
    match infer_type(values) {
        DataType::Boolean => Arc::new(values.iter().map(Value::as_bool).collect::<BooleanArray>()),
        DataType::Int64 => Arc::new(values.iter().map(Value::as_i64).collect::<Int64Array>()),
        DataType::Float64 => Arc::new(values.iter().map(Value::as_f64).collect::<Float64Array>()),
        _ => Arc::new(values.iter().map(json_to_text).collect::<StringArray>()),
    }
}

fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Column names of a batch, in schema order.
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch.schema().fields().iter().map(|f| f.name().clone()).collect()
}
