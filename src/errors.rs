//! Submodule defining the errors used across the crate.
//!
//! Three families of failure exist:
//!
//! - [`Error::Io`]: the underlying byte source or sink failed. Propagated as is.
//! - [`Error::Format`]: the input bytes (or hex text) are malformed. Every
//!   variant of [`FormatError`] carries the offset at which the problem was
//!   detected so that a corrupt changeset can be diagnosed.
//! - [`Error::Invariant`]: the caller asked for something structurally
//!   impossible, e.g. an insert whose value count does not match its table.

use std::sync::Arc;

use crate::entry::Operation;

/// Crate-wide result alias.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors returned by the reader, writer, inverter and exporters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The byte source or sink failed.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// The input is not a well-formed changeset.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A precondition on entries or table descriptors was violated.
    #[error(transparent)]
    Invariant(#[from] InvariantError),

    /// The JSON serializer failed.
    #[cfg(feature = "json")]
    #[error("JSON serialization failed: {0}")]
    Json(#[source] Arc<serde_json::Error>),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(Arc::new(error))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(Arc::new(error))
    }
}

impl Error {
    /// Returns the format error, if this is one.
    #[must_use]
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Error::Format(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the invariant error, if this is one.
    #[must_use]
    pub fn as_invariant(&self) -> Option<&InvariantError> {
        match self {
            Error::Invariant(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true if the underlying source or sink failed.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Malformed binary changeset data or hex text.
///
/// Positions are byte offsets from the start of the stream, or from the start
/// of the text for hex input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The stream ended in the middle of a record.
    #[error("Unexpected end of input at position {0}")]
    UnexpectedEof(u64),

    /// The stream does not start with a changeset table header.
    #[error("Invalid table marker 0x{0:02x} at position {1}")]
    InvalidTableMarker(u8, u64),

    /// The stream is a patchset, which this codec does not handle.
    #[error("Patchset marker at position {0}: only changesets are supported")]
    PatchsetUnsupported(u64),

    /// A row record appeared before any table header.
    #[error("Row record at position {0} precedes any table header")]
    RowBeforeTable(u64),

    /// Unknown record tag.
    #[error("Invalid operation code 0x{0:02x} at position {1}")]
    InvalidOpCode(u8, u64),

    /// The indirect flag following an operation code was neither 0 nor 1.
    #[error("Invalid indirect flag 0x{0:02x} at position {1}")]
    InvalidIndirectFlag(u8, u64),

    /// Unknown value type code.
    #[error("Invalid value type 0x{0:02x} at position {1}")]
    InvalidValueType(u8, u64),

    /// A text value is not valid UTF-8.
    #[error("Invalid UTF-8 in text value at position {0}")]
    InvalidUtf8(u64),

    /// A table name is not valid UTF-8.
    #[error("Invalid UTF-8 in table name at position {0}")]
    InvalidTableName(u64),

    /// A table header declares an empty name.
    #[error("Empty table name at position {0}")]
    EmptyTableName(u64),

    /// A table header declares zero columns.
    #[error("Table header at position {0} declares zero columns")]
    ZeroColumns(u64),

    /// A length or count read from the stream exceeds the configured limit.
    #[error("{what} of {value} at position {position} exceeds the limit of {limit}")]
    LimitExceeded {
        /// What was being measured.
        what: &'static str,
        /// The value found in the stream.
        value: u64,
        /// The configured limit.
        limit: u64,
        /// Where the value was read.
        position: u64,
    },

    /// An insert or delete image contains the undefined marker.
    #[error("{operation} record at position {position} has an undefined value in column {column}")]
    UndefinedValue {
        /// The operation of the offending record.
        operation: Operation,
        /// The column holding the undefined marker.
        column: usize,
        /// Start of the offending record.
        position: u64,
    },

    /// Hex text with an odd number of digits.
    #[error("Hex string has odd length {0}")]
    OddHexLength(usize),

    /// A character that is not a hex digit.
    #[error("Invalid hex character {character:?} at index {index}")]
    InvalidHexCharacter {
        /// The offending character.
        character: char,
        /// Its index in the input.
        index: usize,
    },
}

/// Which value image of an entry an invariant refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The pre-image (`old_values`).
    Old,
    /// The post-image (`new_values`).
    New,
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

/// Precondition violations when building table descriptors or entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    /// Table names must not be empty.
    #[error("Table name must not be empty")]
    EmptyTableName,

    /// Table names are NUL-terminated on the wire.
    #[error("Table name {0:?} contains a NUL byte")]
    NulInTableName(String),

    /// Tables have at least one column.
    #[error("Table {0:?} must have at least one column")]
    ZeroColumns(String),

    /// A value image does not have one value per column.
    #[error("Table {table:?} has {expected} columns but the {side} image has {found} values")]
    ColumnCountMismatch {
        /// The table name.
        table: String,
        /// The offending image.
        side: Side,
        /// The table's column count.
        expected: usize,
        /// The number of values supplied.
        found: usize,
    },

    /// The image must be empty for this operation.
    #[error("{operation} entries carry no {side} values")]
    UnexpectedValues {
        /// The entry's operation.
        operation: Operation,
        /// The image that should have been empty.
        side: Side,
    },

    /// Insert and delete images must be fully defined.
    #[error("{operation} entry has an undefined value in column {column}")]
    UndefinedValue {
        /// The entry's operation.
        operation: Operation,
        /// The offending column.
        column: usize,
    },
}
