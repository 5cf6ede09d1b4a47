//! Row Hasher / Comparator — preprocessed key-column access.
//!
//! A [`RowInterpreter`] is built once per operation over the key columns of a
//! batch. Type dispatch happens exactly once, at construction: each key column
//! is downcast into a [`ColumnKey`] variant, so the per-row hash and equality
//! paths are plain match arms over concrete Arrow arrays with no dynamic
//! dispatch inside the hot loops.

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Float64Type, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use smallvec::SmallVec;

use crate::error::{DfcError, DfcResult};

/// Whether two null key elements compare equal to each other.
///
/// Under [`NullEquality::Unequal`], a row carrying a null in any key column
/// compares equal to no other row — including another row with the exact same
/// null pattern — so every such row forms its own singleton group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullEquality {
    /// Nulls compare equal to nulls (SQL `IS NOT DISTINCT FROM` semantics).
    Equal,
    /// Nulls compare equal to nothing.
    Unequal,
}

/// Hash contribution of a null element. Only relevant under
/// [`NullEquality::Equal`]; under `Unequal`, equality never holds for null
/// rows so their hash value cannot cause incorrect merging.
const NULL_HASH_TAG: u64 = 0x9e37_79b9_7f4a_7c15;

// Fixed seeds so that two interpreters built over different batches (e.g.
// haystack and needles in `contains`) produce comparable hashes.
const HASH_SEEDS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// Typed view over a single key column.
///
/// The closed set of supported key types. Adding a type means adding a
/// variant here plus the three match arms below — nothing else in the engine
/// is type-aware.
#[derive(Debug)]
pub(crate) enum ColumnKey {
    Boolean(BooleanArray),
    Int32(Int32Array),
    Int64(Int64Array),
    Float64(Float64Array),
    Utf8(StringArray),
}

impl ColumnKey {
    fn try_new(array: &ArrayRef) -> DfcResult<Self> {
        match array.data_type() {
            DataType::Boolean => Ok(Self::Boolean(array.as_boolean().clone())),
            DataType::Int32 => Ok(Self::Int32(array.as_primitive::<Int32Type>().clone())),
            DataType::Int64 => Ok(Self::Int64(array.as_primitive::<Int64Type>().clone())),
            DataType::Float64 => Ok(Self::Float64(array.as_primitive::<Float64Type>().clone())),
            DataType::Utf8 => Ok(Self::Utf8(array.as_string::<i32>().clone())),
            dt => Err(DfcError::UnsupportedKeyType(dt.clone())),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::Float64(_) => "Float64",
            Self::Utf8(_) => "Utf8",
        }
    }

    fn is_null(&self, row: usize) -> bool {
        match self {
            Self::Boolean(a) => a.is_null(row),
            Self::Int32(a) => a.is_null(row),
            Self::Int64(a) => a.is_null(row),
            Self::Float64(a) => a.is_null(row),
            Self::Utf8(a) => a.is_null(row),
        }
    }

    fn null_count(&self) -> usize {
        match self {
            Self::Boolean(a) => a.null_count(),
            Self::Int32(a) => a.null_count(),
            Self::Int64(a) => a.null_count(),
            Self::Float64(a) => a.null_count(),
            Self::Utf8(a) => a.null_count(),
        }
    }

    fn hash_value(&self, row: usize, state: &ahash::RandomState) -> u64 {
        match self {
            Self::Boolean(a) => state.hash_one(a.value(row)),
            Self::Int32(a) => state.hash_one(a.value(row)),
            Self::Int64(a) => state.hash_one(a.value(row)),
            Self::Float64(a) => state.hash_one(canonical_f64_bits(a.value(row))),
            Self::Utf8(a) => state.hash_one(a.value(row)),
        }
    }

    /// Value equality between this column at `row` and `other` at
    /// `other_row`. Callers have already handled nulls; both sides are valid.
    fn values_equal(&self, row: usize, other: &ColumnKey, other_row: usize) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.value(row) == b.value(other_row),
            (Self::Int32(a), Self::Int32(b)) => a.value(row) == b.value(other_row),
            (Self::Int64(a), Self::Int64(b)) => a.value(row) == b.value(other_row),
            // Native float equality: NaN keys match nothing, so every NaN row
            // is its own group — same shape as null-Unequal semantics.
            (Self::Float64(a), Self::Float64(b)) => a.value(row) == b.value(other_row),
            (Self::Utf8(a), Self::Utf8(b)) => a.value(row) == b.value(other_row),
            _ => false,
        }
    }
}

/// Canonical bit pattern for float hashing: equal floats must hash equal
/// (`0.0 == -0.0`), and all NaN payloads collapse to one bucket.
fn canonical_f64_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

/// Preprocessed row hasher and comparator over the key columns of a batch.
///
/// Shared read-only by all parallel workers of one operation.
#[derive(Debug)]
pub struct RowInterpreter {
    columns: SmallVec<[ColumnKey; 4]>,
    null_equality: NullEquality,
    has_nulls: bool,
    num_rows: usize,
    state: ahash::RandomState,
}

impl RowInterpreter {
    /// Build an interpreter over `key_columns` of `batch`.
    ///
    /// Validates the key set up front: an empty key set, an out-of-bounds
    /// position, or an unsupported column type is a precondition error —
    /// nothing is scheduled before this returns.
    pub fn try_new(
        batch: &RecordBatch,
        key_columns: &[usize],
        null_equality: NullEquality,
    ) -> DfcResult<Self> {
        if key_columns.is_empty() {
            return Err(DfcError::EmptyKeys);
        }

        let count = batch.num_columns();
        let mut columns: SmallVec<[ColumnKey; 4]> = SmallVec::new();
        for &index in key_columns {
            if index >= count {
                return Err(DfcError::ColumnOutOfBounds { index, count });
            }
            columns.push(ColumnKey::try_new(batch.column(index))?);
        }

        let has_nulls = columns.iter().any(|c| c.null_count() > 0);
        let (k0, k1, k2, k3) = HASH_SEEDS;

        Ok(Self {
            columns,
            null_equality,
            has_nulls,
            num_rows: batch.num_rows(),
            state: ahash::RandomState::with_seeds(k0, k1, k2, k3),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn null_equality(&self) -> NullEquality {
        self.null_equality
    }

    /// 64-bit composite hash of a row, mixing every key column.
    ///
    /// Consistent with [`Self::rows_equal`]: equal rows hash equal.
    pub fn hash_row(&self, row: usize) -> u64 {
        let mut h = 0u64;
        for column in &self.columns {
            let v = if self.has_nulls && column.is_null(row) {
                NULL_HASH_TAG
            } else {
                column.hash_value(row, &self.state)
            };
            // boost-style hash_combine
            h ^= v
                .wrapping_add(0x9e37_79b9_7f4a_7c15)
                .wrapping_add(h << 6)
                .wrapping_add(h >> 2);
        }
        h
    }

    /// Composite-key equality of two rows of the same batch.
    pub fn rows_equal(&self, a: usize, b: usize) -> bool {
        if self.has_nulls {
            self.rows_equal_nullable(&self.columns, a, &self.columns, b)
        } else {
            // Null-free fast path: skip the per-element validity checks.
            self.columns
                .iter()
                .all(|c| c.values_equal(a, c, b))
        }
    }

    /// Cross-batch composite-key equality (haystack row vs. needle row).
    ///
    /// Key schemas must already be [`Self::check_compatible`].
    pub fn rows_equal_across(&self, row: usize, other: &RowInterpreter, other_row: usize) -> bool {
        if self.has_nulls || other.has_nulls {
            self.rows_equal_nullable(&self.columns, row, &other.columns, other_row)
        } else {
            self.columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.values_equal(row, b, other_row))
        }
    }

    fn rows_equal_nullable(
        &self,
        left: &[ColumnKey],
        a: usize,
        right: &[ColumnKey],
        b: usize,
    ) -> bool {
        for (lc, rc) in left.iter().zip(right.iter()) {
            match (lc.is_null(a), rc.is_null(b)) {
                (true, true) => {
                    if self.null_equality == NullEquality::Unequal {
                        return false;
                    }
                }
                (true, false) | (false, true) => return false,
                (false, false) => {
                    if !lc.values_equal(a, rc, b) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether any key column is null at `row`.
    pub fn row_has_null(&self, row: usize) -> bool {
        self.has_nulls && self.columns.iter().any(|c| c.is_null(row))
    }

    /// Verify that `other` has the same key column types, position by
    /// position. Required before cross-batch comparison.
    pub fn check_compatible(&self, other: &RowInterpreter) -> DfcResult<()> {
        if self.columns.len() != other.columns.len() {
            return Err(DfcError::TypeMismatch {
                expected: format!("{} key columns", self.columns.len()),
                actual: format!("{} key columns", other.columns.len()),
            });
        }
        for (a, b) in self.columns.iter().zip(other.columns.iter()) {
            if a.type_name() != b.type_name() {
                return Err(DfcError::TypeMismatch {
                    expected: a.type_name().to_string(),
                    actual: b.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}
