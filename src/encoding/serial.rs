//! SQLite changeset value encoding.
//!
//! **IMPORTANT**: SQLite changesets use a DIFFERENT encoding than database records!
//!
//! Changeset value types (used in this module):
//! - 0: Undefined (special marker for columns not recorded in an image)
//! - 1: INTEGER (always 8 bytes, big-endian i64)
//! - 2: FLOAT (8 bytes, big-endian IEEE 754)
//! - 3: TEXT (varint length + UTF-8 bytes)
//! - 4: BLOB (varint length + raw bytes)
//! - 5: NULL (no data follows)
//!
//! Doubles are carried bit-for-bit: NaN payloads and negative zero survive a
//! decode/encode cycle, which double inversion relies on.

use std::hash::{Hash, Hasher};
use std::io::Read;

use super::constants::value_types;
use super::{ByteSource, encode_varint, read_varint};
use crate::errors::{FormatError, Result};

/// One column's content in one image (old or new) of a row change.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Column not recorded in this image. Only meaningful inside updates.
    #[default]
    Undefined,
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// IEEE 754 floating point
    Double(f64),
    /// UTF-8 text.
    ///
    /// SQLite stores TEXT as raw bytes and will record invalid UTF-8 (for
    /// instance `CAST(X'FF41' AS TEXT)`). Such a slot is rejected by the
    /// reader with [`FormatError::InvalidUtf8`].
    Text(String),
    /// Binary blob
    Blob(Vec<u8>),
}

impl Value {
    /// Check if the value is Undefined.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if the value is Null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The integer payload, if any.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The double payload, if any.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The blob payload, if any.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Lower-case name of the variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// The wire type code of this value.
    #[must_use]
    pub(crate) fn type_code(&self) -> u8 {
        match self {
            Value::Undefined => value_types::UNDEFINED,
            Value::Null => value_types::NULL,
            Value::Integer(_) => value_types::INTEGER,
            Value::Double(_) => value_types::DOUBLE,
            Value::Text(_) => value_types::TEXT,
            Value::Blob(_) => value_types::BLOB,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_code().hash(state);
        match self {
            Value::Integer(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::Undefined | Value::Null => {}
        }
    }
}

// From implementations for common types
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Encode a value into the changeset binary format.
pub(crate) fn encode_value(out: &mut Vec<u8>, value: &Value) {
    out.push(value.type_code());
    match value {
        Value::Undefined | Value::Null => {}
        Value::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Text(s) => {
            encode_varint(out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Blob(b) => {
            encode_varint(out, b.len() as u64);
            out.extend_from_slice(b);
        }
    }
}

/// Decode one value slot from the stream.
///
/// `max_len` bounds the length prefix of text and blob values.
pub(crate) fn decode_value<R: Read>(source: &mut ByteSource<R>, max_len: usize) -> Result<Value> {
    let position = source.position();
    let type_code = source.read_byte()?;

    match type_code {
        value_types::UNDEFINED => Ok(Value::Undefined),
        value_types::NULL => Ok(Value::Null),
        value_types::INTEGER => Ok(Value::Integer(i64::from_be_bytes(source.read_array::<8>()?))),
        value_types::DOUBLE => Ok(Value::Double(f64::from_be_bytes(source.read_array::<8>()?))),
        value_types::TEXT => {
            let bytes = read_length_prefixed(source, max_len, "text length")?;
            String::from_utf8(bytes)
                .map(Value::Text)
                .map_err(|_| FormatError::InvalidUtf8(position).into())
        }
        value_types::BLOB => Ok(Value::Blob(read_length_prefixed(
            source,
            max_len,
            "blob length",
        )?)),
        other => Err(FormatError::InvalidValueType(other, position).into()),
    }
}

fn read_length_prefixed<R: Read>(
    source: &mut ByteSource<R>,
    max_len: usize,
    what: &'static str,
) -> Result<Vec<u8>> {
    let position = source.position();
    let len = read_varint(source)?;
    match usize::try_from(len) {
        Ok(len) if len <= max_len => source.read_bytes(len),
        _ => Err(FormatError::LimitExceeded {
            what,
            value: len,
            limit: max_len as u64,
            position,
        }
        .into()),
    }
}
