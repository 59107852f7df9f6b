//! Error types produced while building packet definitions and decoding
//! packet streams.
use thiserror::Error;

/// A crate-wide `Result`, conveniently wrapping [`DecodeError`].
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised while constructing, planning, or decoding a packet
/// definition. These are all fatal: the caller gets no partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// A [`crate::field::Field`] or [`crate::field::PacketDefinition`] was
    /// constructed with an invalid or disallowed combination of arguments.
    #[error("invalid field definition for '{field}': {reason}")]
    DefinitionError {
        /// Name of the offending field.
        field: String,
        /// Description of the violated invariant.
        reason: String,
    },

    /// The offset planner could not reconcile the field list with the
    /// packet length, or an expanding field was not byte-aligned.
    #[error("layout error for '{field}': {reason}")]
    LayoutError {
        /// Name of the offending field.
        field: String,
        /// Description of the violated invariant.
        reason: String,
    },

    /// A primary header slice was the wrong length, or failed to parse.
    #[error("malformed primary header: {0}")]
    HeaderError(String),

    /// The stream ended mid-packet. Carries the number of bytes that were
    /// expected but unavailable.
    #[error("stream truncated: {missing} bytes missing to complete the packet")]
    Truncation {
        /// Number of bytes needed to complete the last packet.
        missing: usize,
    },

    /// A decoded value did not fit in a field's declared bit width during
    /// encoding, or input column lengths disagreed.
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// Low-level I/O failure reading a file or stream.
    #[error("I/O error during packet decoding")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the converter pipeline (C9). These are fatal to the
/// `load()` call that triggered them, but independent of [`DecodeError`]
/// because they occur strictly after a packet stream has been fully
/// decoded into columns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// An [`crate::convert::EnumConverter`] encountered a value with no
    /// matching key in its replacement dictionary.
    #[error("enum converter missing key(s) for values: {0:?}")]
    EnumMissingKey(Vec<i64>),

    /// A [`crate::convert::DatetimeConverter`] was given a number of input
    /// columns that did not match its unit tuple.
    #[error("datetime converter unit/column count mismatch: {0} units vs {1} columns")]
    UnitMismatch(usize, usize),

    /// A [`crate::convert::StringifyBytesConverter`] was given an unknown
    /// format specifier.
    #[error("unsupported stringify format: {0}")]
    StringifyBadFormat(String),
}
