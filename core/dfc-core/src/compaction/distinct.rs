//! Distinct / Stable-Distinct Orchestrators.
//!
//! [`distinct`] keeps row order unspecified — output rows come out in slot
//! order, so two runs over the same data may order (and for
//! [`KeepPolicy::Any`], pick) rows differently. [`stable_distinct`] sorts the
//! resolved representatives ascending before the gather, so surviving rows
//! appear exactly in input order.

use arrow::array::UInt64Array;
use arrow::compute::take;
use arrow::record_batch::RecordBatch;
use rayon::slice::ParallelSliceMut;
use tracing::debug;

use crate::engine::ParallelExecutionEngine;
use crate::error::DfcResult;
use crate::row::{NullEquality, RowInterpreter};

use super::KeepPolicy;
use super::reduce::resolve_representatives;

/// Resolved representative row indices, one per distinct key, in slot order.
///
/// The index form of [`distinct`], for callers that run their own selection
/// step downstream.
pub fn distinct_indices(
    batch: &RecordBatch,
    key_columns: &[usize],
    keep: KeepPolicy,
    null_equality: NullEquality,
    engine: &ParallelExecutionEngine,
) -> DfcResult<Vec<u64>> {
    // Key validation happens even for zero-row input.
    let rows = RowInterpreter::try_new(batch, key_columns, null_equality)?;
    if rows.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let representatives = resolve_representatives(&rows, keep, engine)?;
    debug!(
        rows = rows.num_rows(),
        keys = key_columns.len(),
        distinct = representatives.len(),
        ?keep,
        "distinct reduction complete"
    );
    Ok(representatives)
}

/// New batch containing one representative row per distinct key.
///
/// Output row order is unspecified; callers requiring a specific order sort
/// downstream or use [`stable_distinct`].
pub fn distinct(
    batch: &RecordBatch,
    key_columns: &[usize],
    keep: KeepPolicy,
    null_equality: NullEquality,
    engine: &ParallelExecutionEngine,
) -> DfcResult<RecordBatch> {
    let indices = distinct_indices(batch, key_columns, keep, null_equality, engine)?;
    gather(batch, &indices)
}

/// Order-preserving distinct: surviving rows keep their relative input order.
pub fn stable_distinct(
    batch: &RecordBatch,
    key_columns: &[usize],
    keep: KeepPolicy,
    null_equality: NullEquality,
    engine: &ParallelExecutionEngine,
) -> DfcResult<RecordBatch> {
    let mut indices = distinct_indices(batch, key_columns, keep, null_equality, engine)?;
    if engine.should_parallelize(indices.len()) {
        engine.execute(|| indices.par_sort_unstable());
    } else {
        indices.sort_unstable();
    }
    gather(batch, &indices)
}

/// Gather `indices` out of `batch` into a fresh batch with the same schema.
fn gather(batch: &RecordBatch, indices: &[u64]) -> DfcResult<RecordBatch> {
    if indices.is_empty() {
        return Ok(RecordBatch::new_empty(batch.schema()));
    }
    let indices = UInt64Array::from(indices.to_vec());
    let columns = batch
        .columns()
        .iter()
        .map(|column| Ok(take(column.as_ref(), &indices, None)?))
        .collect::<DfcResult<Vec<_>>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn make_batch(keys: &[i32], payload: &[&str]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("k", DataType::Int32, false),
            Field::new("v", DataType::Utf8, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(keys.to_vec())),
                Arc::new(StringArray::from(payload.to_vec())),
            ],
        )
        .unwrap()
    }

    fn engine() -> ParallelExecutionEngine {
        ParallelExecutionEngine::new_fixed(2).unwrap()
    }

    #[test]
    fn stable_distinct_preserves_input_order() {
        let batch = make_batch(&[3, 1, 3, 2, 1], &["a", "b", "c", "d", "e"]);
        let out = stable_distinct(
            &batch,
            &[0],
            KeepPolicy::First,
            NullEquality::Equal,
            &engine(),
        )
        .unwrap();
        let keys = out
            .column(0)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        let values = out
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let kept: Vec<i32> = (0..3).map(|i| keys.value(i)).collect();
        assert_eq!(kept, vec![3, 1, 2]);
        assert_eq!(
            (0..3).map(|i| values.value(i)).collect::<Vec<_>>(),
            vec!["a", "b", "d"]
        );
    }

    #[test]
    fn distinct_gathers_whole_rows() {
        let batch = make_batch(&[1, 1, 2], &["x", "y", "z"]);
        let out = distinct(
            &batch,
            &[0],
            KeepPolicy::Last,
            NullEquality::Equal,
            &engine(),
        )
        .unwrap();
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.num_columns(), 2);
        let keys = out
            .column(0)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        let values = out
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        for i in 0..2 {
            // KEEP_LAST: key 1 carries "y", key 2 carries "z".
            match keys.value(i) {
                1 => assert_eq!(values.value(i), "y"),
                2 => assert_eq!(values.value(i), "z"),
                other => panic!("unexpected key {other}"),
            }
        }
    }

    #[test]
    fn empty_input_yields_empty_batch() {
        let batch = make_batch(&[], &[]);
        let out = distinct(
            &batch,
            &[0],
            KeepPolicy::Any,
            NullEquality::Equal,
            &engine(),
        )
        .unwrap();
        assert_eq!(out.num_rows(), 0);
        assert_eq!(out.num_columns(), 2);
        assert_eq!(
            distinct_indices(&batch, &[0], KeepPolicy::Any, NullEquality::Equal, &engine())
                .unwrap(),
            Vec::<u64>::new()
        );
    }

    #[test]
    fn stable_distinct_indices_strictly_increase() {
        let keys: Vec<i32> = (0..5_000).map(|i| i % 41).collect();
        let payload: Vec<String> = keys.iter().map(|k| format!("p{k}")).collect();
        let payload_refs: Vec<&str> = payload.iter().map(String::as_str).collect();
        let batch = make_batch(&keys, &payload_refs);

        let mut indices = distinct_indices(
            &batch,
            &[0],
            KeepPolicy::First,
            NullEquality::Equal,
            &engine(),
        )
        .unwrap();
        indices.sort_unstable();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(indices.len(), 41);
    }
}
