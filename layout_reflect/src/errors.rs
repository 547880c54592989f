use layout_codec::CodecError;
use thiserror::Error;

/// Result alias used across the reflection crate.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors produced while executing operation plans.
#[derive(Debug, Error, PartialEq)]
pub enum ExecError {
    /// Byte-level codec failure (underrun, out-of-range value).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Requested type has no plan in the plan set.
    #[error("type '{type_name}' has no plan")]
    UnknownType { type_name: String },

    /// A required field is absent from the value being encoded.
    #[error("type '{type_name}' is missing field '{field}'")]
    MissingField { type_name: String, field: String },

    /// A field's value does not match its planned representation.
    #[error("field '{field}' has a mismatched value kind (expected {expected})")]
    Mismatch { field: String, expected: &'static str },

    /// A fixed-width buffer field carries the wrong number of bytes.
    #[error("field '{field}' holds {actual} bytes but declares {expected}")]
    ByteLengthMismatch {
        field: String,
        expected: u64,
        actual: usize,
    },

    /// A flags value contains bits no enum member covers.
    #[error("enum '{enum_name}' cannot represent flag value {value}")]
    UnknownFlagBits { enum_name: String, value: u64 },

    /// A deferred conditional has no placeholder bytes to interpret.
    #[error("deferred field '{field}' has no placeholder bytes")]
    MissingPlaceholder { field: String },

    /// Exact-length decode left unconsumed input.
    #[error("decode of '{type_name}' left {remaining} trailing byte(s)")]
    TrailingBytes { type_name: String, remaining: usize },

    /// A runtime length does not fit the address space.
    #[error("{context} of {value} exceeds addressable range")]
    LengthOverflow { context: &'static str, value: u64 },
}
