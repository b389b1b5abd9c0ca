//! Binary encoding utilities for the SQLite changeset format.
//!
//! SQLite uses specific binary encodings for varints and value serialization;
//! blobs leave the binary world through the hex codec.

pub mod constants;
pub mod hex;
pub mod serial;
pub(crate) mod source;
pub(crate) mod varint;

pub use constants::{markers, op_codes, value_types};
pub use self::hex::{bin2hex, hex2bin};
pub(crate) use serial::{decode_value, encode_value};
pub use serial::Value;
pub(crate) use source::ByteSource;
pub(crate) use varint::{encode_varint, read_varint};
