//! Open-Addressing Concurrent Row Set.
//!
//! A fixed-capacity slot table keyed by row index. Slots are `AtomicU64` row
//! indices with `u64::MAX` as the empty sentinel (out of range for any valid
//! row). Insertion uses linear probing with a compare-and-swap slot claim, so
//! many rayon workers can insert concurrently with exactly one winner per
//! distinct key. The table is sized at a 0.5 load factor and probe sequences
//! are bounded by the capacity: exhausting a probe sequence means the sizing
//! math is broken and surfaces as [`DfcError::CapacityOverflow`], never a
//! silent drop.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DfcError, DfcResult};
use crate::row::RowInterpreter;

/// Empty-slot sentinel — a distinguished out-of-range row index.
pub(crate) const EMPTY_SLOT: u64 = u64::MAX;

/// Outcome of one insert attempt: the terminal slot for the row's key, and
/// whether this call was the one that claimed it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotClaim {
    pub slot: usize,
    pub inserted: bool,
}

/// Allocate a slot-sized buffer of atomics, surfacing reservation failure as
/// [`DfcError::OutOfMemory`] instead of aborting.
pub(crate) fn alloc_atomic_u64(len: usize, init: u64) -> DfcResult<Vec<AtomicU64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| DfcError::OutOfMemory {
        requested_bytes: len * std::mem::size_of::<AtomicU64>(),
    })?;
    buf.extend((0..len).map(|_| AtomicU64::new(init)));
    Ok(buf)
}

/// Fixed-capacity concurrent hash set of row indices.
pub(crate) struct RowSet {
    slots: Vec<AtomicU64>,
    mask: u64,
}

impl RowSet {
    /// Capacity for `n` rows at a 0.5 load factor, rounded up to a power of
    /// two so probing can use a bit mask.
    fn capacity_for(n: usize) -> usize {
        (n.max(1) * 2).next_power_of_two()
    }

    /// Build a set sized for `n` rows.
    pub fn with_row_count(n: usize) -> DfcResult<Self> {
        Self::with_capacity(Self::capacity_for(n))
    }

    fn with_capacity(capacity: usize) -> DfcResult<Self> {
        debug_assert!(capacity.is_power_of_two());
        let slots = alloc_atomic_u64(capacity, EMPTY_SLOT)?;
        Ok(Self {
            slots,
            mask: capacity as u64 - 1,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Row index currently stored in `slot`, or [`EMPTY_SLOT`].
    pub fn slot(&self, slot: usize) -> u64 {
        self.slots[slot].load(Ordering::Acquire)
    }

    /// Insert `row` into the set.
    ///
    /// Probes from `hash(row)`; claims the first empty slot via CAS, or stops
    /// at a slot whose occupant compares equal under `rows` (the row joins
    /// that key's equivalence class — slot count is unchanged). Idempotent
    /// with respect to slot count for duplicate keys.
    pub fn insert(&self, rows: &RowInterpreter, row: u64) -> DfcResult<SlotClaim> {
        let hash = rows.hash_row(row as usize);
        let mut slot = (hash & self.mask) as usize;

        for _ in 0..self.slots.len() {
            let current = self.slots[slot].load(Ordering::Acquire);
            if current == EMPTY_SLOT {
                match self.slots[slot].compare_exchange(
                    EMPTY_SLOT,
                    row,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return Ok(SlotClaim { slot, inserted: true }),
                    Err(raced) => {
                        // Lost the claim race. If the winner holds our key we
                        // are done; otherwise keep probing from this slot.
                        if rows.rows_equal(raced as usize, row as usize) {
                            return Ok(SlotClaim {
                                slot,
                                inserted: false,
                            });
                        }
                    }
                }
            } else if rows.rows_equal(current as usize, row as usize) {
                return Ok(SlotClaim {
                    slot,
                    inserted: false,
                });
            }
            slot = ((slot as u64 + 1) & self.mask) as usize;
        }

        Err(DfcError::CapacityOverflow {
            capacity: self.slots.len(),
        })
    }

    /// Locate the slot holding `row`'s key after construction.
    ///
    /// The identity check (`current == row`) comes before the comparator:
    /// under null-Unequal semantics a null row is not equal even to itself,
    /// but it did claim a slot holding its own index, and that slot must be
    /// findable for the reduction pass.
    pub fn find_slot(&self, rows: &RowInterpreter, row: u64) -> Option<usize> {
        let hash = rows.hash_row(row as usize);
        let mut slot = (hash & self.mask) as usize;

        for _ in 0..self.slots.len() {
            let current = self.slots[slot].load(Ordering::Acquire);
            if current == EMPTY_SLOT {
                return None;
            }
            if current == row || rows.rows_equal(current as usize, row as usize) {
                return Some(slot);
            }
            slot = ((slot as u64 + 1) & self.mask) as usize;
        }
        None
    }

    /// Read-only membership probe for a row of a *different* batch.
    ///
    /// `haystack` is the interpreter the set was built with; `needles`
    /// interprets the query batch. Never mutates the set.
    pub fn contains_row(
        &self,
        haystack: &RowInterpreter,
        needles: &RowInterpreter,
        needle_row: u64,
    ) -> bool {
        let hash = needles.hash_row(needle_row as usize);
        let mut slot = (hash & self.mask) as usize;

        for _ in 0..self.slots.len() {
            let current = self.slots[slot].load(Ordering::Acquire);
            if current == EMPTY_SLOT {
                return false;
            }
            if haystack.rows_equal_across(current as usize, needles, needle_row as usize) {
                return true;
            }
            slot = ((slot as u64 + 1) & self.mask) as usize;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::NullEquality;
    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn batch(values: &[Option<i32>]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("k", DataType::Int32, true)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(values.to_vec()))]).unwrap()
    }

    fn interpreter(values: &[Option<i32>], nulls: NullEquality) -> RowInterpreter {
        RowInterpreter::try_new(&batch(values), &[0], nulls).unwrap()
    }

    #[test]
    fn duplicate_keys_share_one_slot() {
        let rows = interpreter(&[Some(7), Some(7), Some(7)], NullEquality::Equal);
        let set = RowSet::with_row_count(3).unwrap();

        let first = set.insert(&rows, 0).unwrap();
        assert!(first.inserted);
        let second = set.insert(&rows, 1).unwrap();
        assert!(!second.inserted);
        assert_eq!(second.slot, first.slot);
        let third = set.insert(&rows, 2).unwrap();
        assert_eq!(third.slot, first.slot);

        let occupied = (0..set.capacity()).filter(|&s| set.slot(s) != EMPTY_SLOT).count();
        assert_eq!(occupied, 1);
    }

    #[test]
    fn distinct_keys_claim_distinct_slots() {
        let rows = interpreter(&[Some(1), Some(2), Some(3)], NullEquality::Equal);
        let set = RowSet::with_row_count(3).unwrap();
        for row in 0..3 {
            assert!(set.insert(&rows, row).unwrap().inserted);
        }
        let occupied = (0..set.capacity()).filter(|&s| set.slot(s) != EMPTY_SLOT).count();
        assert_eq!(occupied, 3);
    }

    #[test]
    fn null_rows_unequal_each_claim_own_slot() {
        let rows = interpreter(&[None, None, None], NullEquality::Unequal);
        let set = RowSet::with_row_count(3).unwrap();
        for row in 0..3 {
            assert!(set.insert(&rows, row).unwrap().inserted);
        }
        // Each null row is findable through the identity check.
        for row in 0..3u64 {
            let slot = set.find_slot(&rows, row).unwrap();
            assert_eq!(set.slot(slot), row);
        }
    }

    #[test]
    fn null_rows_equal_merge() {
        let rows = interpreter(&[None, None], NullEquality::Equal);
        let set = RowSet::with_row_count(2).unwrap();
        assert!(set.insert(&rows, 0).unwrap().inserted);
        assert!(!set.insert(&rows, 1).unwrap().inserted);
    }

    #[test]
    fn find_slot_resolves_to_class_representative() {
        let rows = interpreter(&[Some(5), Some(9), Some(5)], NullEquality::Equal);
        let set = RowSet::with_row_count(3).unwrap();
        for row in 0..3 {
            set.insert(&rows, row).unwrap();
        }
        let a = set.find_slot(&rows, 0).unwrap();
        let b = set.find_slot(&rows, 2).unwrap();
        assert_eq!(a, b);
        assert_ne!(set.find_slot(&rows, 1).unwrap(), a);
    }

    #[test]
    fn probe_exhaustion_is_capacity_overflow() {
        // Undersized table on purpose: three distinct keys, two slots.
        let rows = interpreter(&[Some(1), Some(2), Some(3)], NullEquality::Equal);
        let set = RowSet::with_capacity(2).unwrap();
        set.insert(&rows, 0).unwrap();
        set.insert(&rows, 1).unwrap();
        let err = set.insert(&rows, 2).unwrap_err();
        assert!(matches!(err, DfcError::CapacityOverflow { capacity: 2 }));
    }

    #[test]
    fn concurrent_inserts_one_winner_per_key() {
        use rayon::prelude::*;
        let values: Vec<Option<i32>> = (0..10_000).map(|i| Some(i % 97)).collect();
        let rows = interpreter(&values, NullEquality::Equal);
        let set = RowSet::with_row_count(values.len()).unwrap();

        (0..values.len() as u64)
            .into_par_iter()
            .try_for_each(|row| set.insert(&rows, row).map(|_| ()))
            .unwrap();

        let occupied = (0..set.capacity()).filter(|&s| set.slot(s) != EMPTY_SLOT).count();
        assert_eq!(occupied, 97);
    }

    #[test]
    fn cross_batch_contains_probe() {
        let hay = interpreter(&[Some(1), Some(2), Some(2)], NullEquality::Equal);
        let set = RowSet::with_row_count(3).unwrap();
        for row in 0..3 {
            set.insert(&hay, row).unwrap();
        }
        let needles = interpreter(&[Some(2), Some(4)], NullEquality::Equal);
        assert!(set.contains_row(&hay, &needles, 0));
        assert!(!set.contains_row(&hay, &needles, 1));
    }
}
