//! Schema-reconciling merge of two asset tables.
//!
//! `small` is authoritative: every column it shares with `big` is replaced
//! by `small`'s values, and every column only `small` has is appended after
//! `big`'s own columns. The result keeps `big`'s row count.
//!
//! Rows are matched by position unless [`MergeMode::KeyAligned`] is
//! requested explicitly. Under the positional contract row `i` of `small`
//! lands on row `i` of `big`; if `small` is shorter the remaining rows are
//! null, if it is longer the surplus is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, UInt32Array};
use arrow::compute::{cast, take};
use arrow::datatypes::{Field, FieldRef, Schema};
use arrow::util::display::array_value_to_string;

use super::Tabular;
use crate::Error;

/// How rows of `small` are lined up against rows of `big`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Row `i` of `small` overwrites row `i` of `big`.
    #[default]
    Positional,
    /// Rows are matched on equal values of `key`; the first matching row of
    /// `small` wins. Unmatched rows of `big` keep their own values.
    KeyAligned { key: String },
}

/// Merge `small` into `big` using the positional contract.
///
/// # Errors
///
/// - `Error::TypeMismatch` if either input is not tabular
/// - `Error::NoCommonFields` if the two schemas are disjoint
pub fn merge_tables(big: impl Into<Tabular>, small: impl Into<Tabular>) -> Result<RecordBatch, Error> {
    merge_tables_with(big, small, &MergeMode::Positional)
}

/// Merge `small` into `big` with an explicit row alignment mode.
pub fn merge_tables_with(
    big: impl Into<Tabular>, small: impl Into<Tabular>, mode: &MergeMode,
) -> Result<RecordBatch, Error> {
    let big = big.into().into_batch()?;
    let small = small.into().into_batch()?;

    let big_schema = big.schema();
    let small_schema = small.schema();

    let common: Vec<&str> = big_schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .filter(|name| small_schema.index_of(name).is_ok())
        .collect();
    if common.is_empty() {
        return Err(Error::NoCommonFields);
    }

    let small_only: Vec<&FieldRef> =
        small_schema.fields().iter().filter(|f| big_schema.index_of(f.name()).is_err()).collect();

    let alignment = match mode {
        MergeMode::Positional => positional_indices(big.num_rows(), small.num_rows()),
        MergeMode::KeyAligned { key } => key_indices(&big, &small, key)?,
    };

    tracing::debug!(
        common = common.len(),
        added = small_only.len(),
        big_rows = big.num_rows(),
        small_rows = small.num_rows(),
        ?mode,
        "merging tables"
    );

    let mut fields: Vec<Field> = Vec::with_capacity(big.num_columns() + small_only.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

    for (idx, big_field) in big_schema.fields().iter().enumerate() {
        match small_schema.index_of(big_field.name()) {
            Ok(small_idx) => {
                let taken = take(small.column(small_idx).as_ref(), &alignment, None)?;
                let column = match mode {
                    MergeMode::KeyAligned { .. } => fill_unmatched(taken, big.column(idx), &alignment)?,
                    MergeMode::Positional => taken,
                };
                fields.push(Field::new(big_field.name(), column.data_type().clone(), true));
                columns.push(column);
            }
            Err(_) => {
                fields.push(big_field.as_ref().clone());
                columns.push(big.column(idx).clone());
            }
        }
    }

    for small_field in small_only {
        let small_idx = small_schema.index_of(small_field.name())?;
        let column = take(small.column(small_idx).as_ref(), &alignment, None)?;
        fields.push(Field::new(small_field.name(), column.data_type().clone(), true));
        columns.push(column);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Index `i` for every row of `big` that `small` covers, null past its end.
fn positional_indices(big_rows: usize, small_rows: usize) -> UInt32Array {
    (0..big_rows).map(|i| (i < small_rows).then_some(i as u32)).collect()
}

/// For every row of `big`, the first row of `small` with the same key.
fn key_indices(big: &RecordBatch, small: &RecordBatch, key: &str) -> Result<UInt32Array, Error> {
    let big_key = big
        .column_by_name(key)
        .ok_or_else(|| Error::InvalidInput(format!("merge key `{key}` missing from big table")))?;
    let small_key = small
        .column_by_name(key)
        .ok_or_else(|| Error::InvalidInput(format!("merge key `{key}` missing from small table")))?;

    let mut positions: HashMap<String, u32> = HashMap::with_capacity(small_key.len());
    for row in (0..small_key.len()).rev() {
        if small_key.is_valid(row) {
            positions.insert(array_value_to_string(small_key, row)?, row as u32);
        }
    }

    (0..big_key.len())
        .map(|row| {
            if big_key.is_null(row) {
                return Ok(None);
            }
            Ok(positions.get(&array_value_to_string(big_key, row)?).copied())
        })
        .collect::<Result<Vec<Option<u32>>, Error>>()
        .map(UInt32Array::from)
}

/// Keep `big`'s own value wherever no `small` row was matched.
fn fill_unmatched(taken: ArrayRef, original: &ArrayRef, alignment: &UInt32Array) -> Result<ArrayRef, Error> {
    if alignment.null_count() == 0 {
        return Ok(taken);
    }
    let original = if original.data_type() == taken.data_type() {
        original.clone()
    } else {
        cast(original.as_ref(), taken.data_type())?
    };
    let keep_big = arrow::array::BooleanArray::from_iter((0..alignment.len()).map(|i| Some(alignment.is_null(i))));
    Ok(arrow::compute::kernels::zip::zip(&keep_big, &original, &taken)?)
}
