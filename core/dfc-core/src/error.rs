//! Error types for the DFC compaction engine.
//!
//! All public APIs return `DfcResult<T>` — no panics in library code.

use arrow::datatypes::DataType;
use thiserror::Error;

/// Unified error type for all DFC operations.
#[derive(Debug, Error)]
pub enum DfcError {
    /// No key columns were supplied
    #[error("key column set is empty")]
    EmptyKeys,

    /// A key column position is past the end of the schema
    #[error("key column {index} out of bounds (batch has {count} columns)")]
    ColumnOutOfBounds { index: usize, count: usize },

    /// Column type outside the supported key-type set
    #[error("unsupported key column type: {0}")]
    UnsupportedKeyType(DataType),

    /// Type mismatch between expected and actual values
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Slot-table or payload buffer reservation failed
    #[error("out of memory: failed to reserve {requested_bytes} bytes")]
    OutOfMemory { requested_bytes: usize },

    /// Probe sequence exhausted without finding a slot — a sizing bug,
    /// not a user-recoverable condition
    #[error("hash map capacity overflow (capacity {capacity})")]
    CapacityOverflow { capacity: usize },

    /// Apache Arrow error (gather / RecordBatch operations)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },

    /// Invalid operation
    #[error("invalid operation: {message}\nContext: {context}")]
    InvalidOperation { message: String, context: String },

    /// Invalid arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Result type alias for all DFC operations.
pub type DfcResult<T> = Result<T, DfcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_empty_keys() {
        let err = DfcError::EmptyKeys;
        assert_eq!(err.to_string(), "key column set is empty");
    }

    #[test]
    fn error_display_column_out_of_bounds() {
        let err = DfcError::ColumnOutOfBounds { index: 7, count: 3 };
        assert_eq!(
            err.to_string(),
            "key column 7 out of bounds (batch has 3 columns)"
        );
    }

    #[test]
    fn error_display_unsupported_key_type() {
        let err = DfcError::UnsupportedKeyType(DataType::Date32);
        assert!(err.to_string().contains("unsupported key column type"));
    }

    #[test]
    fn error_display_type_mismatch() {
        let err = DfcError::TypeMismatch {
            expected: "Int32".to_string(),
            actual: "Utf8".to_string(),
        };
        assert_eq!(err.to_string(), "type mismatch: expected Int32, got Utf8");
    }

    #[test]
    fn error_display_capacity_overflow() {
        let err = DfcError::CapacityOverflow { capacity: 1024 };
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn dfc_result_ok() {
        let result: DfcResult<i32> = Ok(42);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn dfc_result_err() {
        let result: DfcResult<i32> = Err(DfcError::EmptyKeys);
        assert!(result.is_err());
    }
}
