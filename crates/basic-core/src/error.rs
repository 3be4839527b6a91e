//! # Error Types
//!
//! Every failure the engine can report is a variant of [`SchemaError`].
//! Errors are raised at the point of detection and returned to the
//! immediate caller; nothing is retried or swallowed internally.
//!
//! ## Design
//!
//! - Shape errors name the expected descriptor and the actual value kind.
//! - Record errors name the record and the offending field.
//! - Null values are not errors: they pass through every descriptor
//!   unchanged and never reach this module.

use thiserror::Error;

/// Top-level error type for descriptor and record operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A value's native shape does not match the descriptor.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Display name of the descriptor that rejected the value.
        expected: String,
        /// Kind (and short rendering) of the rejected value.
        actual: String,
    },

    /// A tuple (or template parameter list) has the wrong number of elements.
    #[error("arity mismatch for {descriptor}: expected {expected} elements, got {actual}")]
    Arity {
        /// Descriptor that imposed the arity.
        descriptor: String,
        /// Accepted element count, e.g. `2` or `1 or 2`.
        expected: String,
        /// Observed element count.
        actual: usize,
    },

    /// A field name does not exist in the record schema.
    #[error("{record} has no field '{field}'")]
    UnknownField {
        /// Record descriptor name.
        record: String,
        /// The unknown field name.
        field: String,
    },

    /// A required field was not supplied at construction.
    #[error("missing argument '{field}' for {record}")]
    MissingField {
        /// Record descriptor name.
        record: String,
        /// The missing field name.
        field: String,
    },

    /// A declared field is currently absent from the record.
    #[error("field '{field}' of {record} is not set")]
    FieldNotSet {
        /// Record descriptor name.
        record: String,
        /// The absent field name.
        field: String,
    },

    /// A default was requested from a descriptor whose policy forbids it.
    #[error("default policy violation: {0}")]
    Policy(String),

    /// Template parameters were bound on an already specialized container.
    #[error("cannot specialize already specialized type {0}")]
    AlreadySpecialized(String),

    /// A forward reference was used before being resolved.
    #[error("forward reference '{0}' used before resolution")]
    UnresolvedReference(String),

    /// A descriptor does not implement the requested wire target.
    #[error("{descriptor} does not support the {target} target")]
    UnsupportedTarget {
        /// Descriptor asked to convert.
        descriptor: String,
        /// The unsupported target.
        target: String,
    },

    /// Encoded text could not be decoded (base85, timestamps).
    #[error("invalid encoding for {descriptor}: {reason}")]
    InvalidEncoding {
        /// Descriptor performing the decode.
        descriptor: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// A bound target constructor rejected its arguments.
    #[error("construction of {target} failed: {reason}")]
    Construction {
        /// Name of the target callable.
        target: String,
        /// Reason reported by the constructor.
        reason: String,
    },
}

impl SchemaError {
    pub(crate) fn mismatch(expected: impl Into<String>, actual: &crate::value::Value) -> Self {
        SchemaError::TypeMismatch {
            expected: expected.into(),
            actual: actual.describe(),
        }
    }

    /// Shorthand used by target constructors to report bad arguments.
    pub fn construction(target: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Construction {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_mismatch_message_names_both_sides() {
        let err = SchemaError::mismatch("Int", &Value::Str("5".into()));
        assert_eq!(err.to_string(), "type mismatch: expected Int, got str \"5\"");
    }

    #[test]
    fn test_record_errors_name_field() {
        let err = SchemaError::UnknownField {
            record: "Person".into(),
            field: "unknown".into(),
        };
        assert_eq!(err.to_string(), "Person has no field 'unknown'");
    }
}
