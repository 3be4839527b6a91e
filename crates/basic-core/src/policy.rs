//! # Sentinels
//!
//! The default-value policies a descriptor can carry, and the two wire
//! targets a value can be converted to or from.

use std::fmt;

use crate::value::Value;

/// What a record does with a field the caller did not supply.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultPolicy {
    /// The field must be supplied.
    #[default]
    Required,
    /// Use this concrete value.
    Value(Value),
    /// Construct a fresh value with the descriptor's zero-argument constructor.
    Empty,
    /// Leave the field unset.
    Missing,
    /// Compute the current time when the record is constructed.
    Now,
}

impl DefaultPolicy {
    /// Whether a value can be produced without the caller supplying one.
    pub fn has_default(&self) -> bool {
        !matches!(self, DefaultPolicy::Required)
    }
}

/// A wire representation a descriptor converts values to and from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Text-safe tree: bytes become base85 text, timestamps become RFC 3339 strings.
    Json,
    /// Document-store tree: bytes and timestamps are kept native.
    Bson,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Json => f.write_str("JSON"),
            Target::Bson => f.write_str("BSON"),
        }
    }
}
