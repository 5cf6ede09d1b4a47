//! Unique-Count / Contains Helpers.
//!
//! Degenerate consumers of the row set: [`unique_count`] stops after the
//! insert pass and counts occupied slots; [`contains`] probes a constructed
//! set read-only with rows of a second batch.

use arrow::array::BooleanArray;
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use tracing::debug;

use crate::engine::ParallelExecutionEngine;
use crate::error::DfcResult;
use crate::map::EMPTY_SLOT;
use crate::row::{NullEquality, RowInterpreter};

use super::NullPolicy;
use super::reduce::build_row_set;

/// Number of distinct keys in `batch`.
///
/// [`NullPolicy::Exclude`] skips groups whose representative carries a null
/// in any key column; under [`NullEquality::Unequal`] every null row is its
/// own group, so excluding nulls removes each of them individually.
pub fn unique_count(
    batch: &RecordBatch,
    key_columns: &[usize],
    null_equality: NullEquality,
    null_policy: NullPolicy,
    engine: &ParallelExecutionEngine,
) -> DfcResult<usize> {
    let rows = RowInterpreter::try_new(batch, key_columns, null_equality)?;
    if rows.num_rows() == 0 {
        return Ok(0);
    }

    let set = build_row_set(&rows, engine)?;
    let count_slot = |slot: usize| -> usize {
        let occupant = set.slot(slot);
        if occupant == EMPTY_SLOT {
            return 0;
        }
        if null_policy == NullPolicy::Exclude && rows.row_has_null(occupant as usize) {
            return 0;
        }
        1
    };

    let count = if engine.should_parallelize(set.capacity()) {
        engine.execute(|| (0..set.capacity()).into_par_iter().map(count_slot).sum())
    } else {
        (0..set.capacity()).map(count_slot).sum()
    };

    debug!(rows = rows.num_rows(), distinct = count, "unique count complete");
    Ok(count)
}

/// Membership of each `needles` row among the keys of `haystack`.
///
/// `key_columns` indexes both batches: position `i` of the key in `haystack`
/// is compared against position `i` in `needles`, and the column types must
/// match pairwise. The haystack set is built once and probed read-only.
pub fn contains(
    haystack: &RecordBatch,
    needles: &RecordBatch,
    key_columns: &[usize],
    null_equality: NullEquality,
    engine: &ParallelExecutionEngine,
) -> DfcResult<BooleanArray> {
    let hay_rows = RowInterpreter::try_new(haystack, key_columns, null_equality)?;
    let needle_rows = RowInterpreter::try_new(needles, key_columns, null_equality)?;
    hay_rows.check_compatible(&needle_rows)?;

    let needle_count = needle_rows.num_rows();
    if needle_count == 0 {
        return Ok(BooleanArray::from(Vec::<bool>::new()));
    }
    if hay_rows.num_rows() == 0 {
        return Ok(BooleanArray::from(vec![false; needle_count]));
    }

    let set = build_row_set(&hay_rows, engine)?;
    let probe = |row: usize| set.contains_row(&hay_rows, &needle_rows, row as u64);

    let matches: Vec<bool> = if engine.should_parallelize(needle_count) {
        engine.execute(|| (0..needle_count).into_par_iter().map(probe).collect())
    } else {
        (0..needle_count).map(probe).collect()
    };

    debug!(
        haystack_rows = hay_rows.num_rows(),
        needles = needle_count,
        "contains probe complete"
    );
    Ok(BooleanArray::from(matches))
}
