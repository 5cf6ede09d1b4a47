//! Stream Compaction — distinct rows, unique counts, membership.
//!
//! Pipeline for every operation: preprocess the key columns into a
//! [`crate::row::RowInterpreter`] → build the concurrent row set → run the
//! keep-policy reduction → gather (or count / probe). The stages are strictly
//! sequential; all parallelism lives inside each stage.

pub mod distinct;
pub mod unique;

mod reduce;

/// Which row of a duplicate group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    /// An arbitrary row of each group — whichever row wins the slot claim.
    /// Intentionally non-deterministic across runs; callers needing stable
    /// output use [`distinct::stable_distinct`].
    Any,
    /// The lowest row index of each group.
    First,
    /// The highest row index of each group.
    Last,
    /// No row of any group of size > 1 — only true singletons survive.
    None,
}

/// Whether null-key groups participate in [`unique::unique_count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Null-key groups count like any other group.
    Include,
    /// Groups whose representative has a null in any key column are skipped.
    Exclude,
}

pub use distinct::{distinct, distinct_indices, stable_distinct};
pub use unique::{contains, unique_count};
