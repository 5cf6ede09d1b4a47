//! Distinct-Reduction Engine.
//!
//! Drives row-set construction and resolves one representative row per
//! distinct key under a [`KeepPolicy`]. Three bulk-synchronous passes, each a
//! rayon pass over row (or slot) indices with the pass boundary as the
//! barrier:
//!
//! 1. **Insert** — every row attempts [`RowSet::insert`]; for
//!    [`KeepPolicy::None`] the terminal slot's occurrence counter is bumped
//!    on every attempt, winning or not.
//! 2. **Reduce** — for First/Last only: each row re-locates its key's slot
//!    and applies `fetch_min` / `fetch_max` to the best-index payload. Min
//!    and max are associative-commutative, so the result is independent of
//!    thread scheduling.
//! 3. **Collect** — occupied slots are resolved to their representative row
//!    index; `None` slots with a count other than exactly 1 are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tracing::debug;

use crate::engine::ParallelExecutionEngine;
use crate::error::{DfcError, DfcResult};
use crate::map::{EMPTY_SLOT, RowSet, alloc_atomic_u64};
use crate::row::RowInterpreter;

use super::KeepPolicy;

/// Per-slot auxiliary state for the reduction passes.
enum SlotPayload {
    /// Any: the slot occupant is already the representative.
    Occupant,
    /// First/Last: monotone best-index reduction.
    Best { best: Vec<AtomicU64>, take_min: bool },
    /// None: occurrence counter per slot.
    Counts(Vec<AtomicU64>),
}

impl SlotPayload {
    fn for_policy(keep: KeepPolicy, capacity: usize) -> DfcResult<Self> {
        Ok(match keep {
            KeepPolicy::Any => Self::Occupant,
            KeepPolicy::First => Self::Best {
                best: alloc_atomic_u64(capacity, u64::MAX)?,
                take_min: true,
            },
            KeepPolicy::Last => Self::Best {
                best: alloc_atomic_u64(capacity, 0)?,
                take_min: false,
            },
            KeepPolicy::None => Self::Counts(alloc_atomic_u64(capacity, 0)?),
        })
    }
}

/// Run `f` over `[0, n)`, in the engine's pool when the workload justifies it.
fn run_pass<F>(engine: &ParallelExecutionEngine, n: usize, f: F) -> DfcResult<()>
where
    F: Fn(u64) -> DfcResult<()> + Send + Sync,
{
    if engine.should_parallelize(n) {
        engine.execute(|| (0..n as u64).into_par_iter().try_for_each(&f))
    } else {
        (0..n as u64).try_for_each(f)
    }
}

/// Build the row set only — the shared path for `unique_count` and
/// `contains`, which never need a reduction pass.
pub(crate) fn build_row_set(
    rows: &RowInterpreter,
    engine: &ParallelExecutionEngine,
) -> DfcResult<RowSet> {
    let set = RowSet::with_row_count(rows.num_rows())?;
    run_pass(engine, rows.num_rows(), |row| {
        set.insert(rows, row).map(|_| ())
    })?;
    Ok(set)
}

/// Resolve one representative row index per distinct key.
///
/// The returned indices are in slot order — arbitrary with respect to the
/// input and deliberately left that way (the stable orchestrator sorts).
pub(crate) fn resolve_representatives(
    rows: &RowInterpreter,
    keep: KeepPolicy,
    engine: &ParallelExecutionEngine,
) -> DfcResult<Vec<u64>> {
    let n = rows.num_rows();
    debug_assert!(n > 0, "zero-row input short-circuits before reduction");

    let set = RowSet::with_row_count(n)?;
    let payload = SlotPayload::for_policy(keep, set.capacity())?;
    debug!(rows = n, capacity = set.capacity(), "row set sized");

    // Pass 1: insert every row; count attempts for KeepPolicy::None.
    run_pass(engine, n, |row| {
        let claim = set.insert(rows, row)?;
        if let SlotPayload::Counts(counts) = &payload {
            counts[claim.slot].fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    })?;

    // Pass 2: monotone best-index reduction for First/Last.
    if let SlotPayload::Best { best, take_min } = &payload {
        run_pass(engine, n, |row| {
            let slot = set.find_slot(rows, row).ok_or_else(|| {
                DfcError::InvalidOperation {
                    message: "row key not found after insertion".to_string(),
                    context: format!("row {row} of {n}"),
                }
            })?;
            if *take_min {
                best[slot].fetch_min(row, Ordering::Relaxed);
            } else {
                best[slot].fetch_max(row, Ordering::Relaxed);
            }
            Ok(())
        })?;
    }

    // Pass 3: collect representatives from occupied slots.
    let resolve_slot = |slot: usize| -> Option<u64> {
        let occupant = set.slot(slot);
        if occupant == EMPTY_SLOT {
            return None;
        }
        match &payload {
            SlotPayload::Occupant => Some(occupant),
            SlotPayload::Best { best, .. } => Some(best[slot].load(Ordering::Relaxed)),
            SlotPayload::Counts(counts) => {
                (counts[slot].load(Ordering::Relaxed) == 1).then_some(occupant)
            }
        }
    };

    let representatives = if engine.should_parallelize(set.capacity()) {
        engine.execute(|| {
            (0..set.capacity())
                .into_par_iter()
                .filter_map(resolve_slot)
                .collect()
        })
    } else {
        (0..set.capacity()).filter_map(resolve_slot).collect()
    };

    Ok(representatives)
}
