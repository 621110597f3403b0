//! Error types for record decoding.

use thiserror::Error;

/// Why a remote record was rejected instead of becoming a feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A required field is absent.
    #[error("missing field: {field}")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },

    /// A required field has the wrong shape.
    #[error("field {field} has wrong type (expected {expected})")]
    WrongType {
        /// Wire name of the field.
        field: &'static str,
        /// Human-readable expected shape.
        expected: &'static str,
    },

    /// A required string field is empty.
    #[error("field {field} is empty")]
    EmptyField {
        /// Wire name of the field.
        field: &'static str,
    },
}
