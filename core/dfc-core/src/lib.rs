//! # DFC — Columnar Stream-Compaction Engine
//!
//! DFC determines row uniqueness over Apache Arrow batches using a
//! concurrent open-addressing hash set keyed by row index, and reduces each
//! duplicate group to a single representative row under a configurable keep
//! policy. All shared-state mutation is a single atomic operation (CAS slot
//! claim, min/max/count reduction), so the passes parallelize over every row
//! with no locks.
//!
//! ## Operations
//!
//! - [`distinct`] — one representative row per distinct multi-column key,
//!   output order unspecified
//! - [`stable_distinct`] — same, with surviving rows in input order
//! - [`distinct_indices`] — the representative row indices only
//! - [`unique_count`] — number of distinct keys
//! - [`contains`] — membership of one batch's rows among another's keys
//!
//! ## Quick start
//!
//! ```rust
//! use arrow::array::Int32Array;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use dfc_core::{distinct, KeepPolicy, NullEquality, ParallelExecutionEngine};
//! use std::sync::Arc;
//!
//! # fn main() -> dfc_core::DfcResult<()> {
//! let schema = Arc::new(Schema::new(vec![Field::new("k", DataType::Int32, false)]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![Arc::new(Int32Array::from(vec![1, 2, 1, 3, 2]))],
//! )?;
//!
//! let engine = ParallelExecutionEngine::new_auto()?;
//! let unique = distinct(&batch, &[0], KeepPolicy::Any, NullEquality::Equal, &engine)?;
//! assert_eq!(unique.num_rows(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module structure
//!
//! - [`compaction`] — distinct / stable-distinct orchestrators, reduction
//!   engine, unique-count and contains helpers
//! - [`row`] — preprocessed row hasher / comparator over the key columns
//! - [`engine`] — rayon-backed parallel execution engine
//! - [`error`] — unified error type
//! - [`logging`] — tracing subscriber helpers

pub mod compaction;
pub mod engine;
pub mod error;
pub mod row;

// Open-addressing concurrent row set; internal to the compaction pipeline.
mod map;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use compaction::{
    KeepPolicy, NullPolicy, contains, distinct, distinct_indices, stable_distinct, unique_count,
};
pub use engine::{ParallelExecutionEngine, ParallelizationPolicy};
pub use error::{DfcError, DfcResult};
pub use row::NullEquality;
