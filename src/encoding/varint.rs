//! SQLite varint encoding/decoding.
//!
//! SQLite changesets use a big-endian variable-length integer encoding where:
//! - The high bit of each byte is a continuation flag (1 = more bytes follow)
//! - The remaining 7 bits are data, with MSB first
//! - A ninth byte, if reached, contributes all 8 of its bits
//!
//! For example, 300 (0x12C) encodes as:
//! - Binary: 100101100 (9 bits)
//! - Split into 7-bit groups from MSB: 0000010, 0101100
//! - First byte: 0x80 | 2 = 0x82 (continuation)
//! - Second byte: 0x2c (no continuation)
//! - Result: [0x82, 0x2c]

use std::io::Read;

use crate::encoding::ByteSource;
use crate::errors::Result;

/// Largest value that fits in eight 7-bit groups.
const EIGHT_GROUP_MAX: u64 = (1 << 56) - 1;

/// Append `value` to `out` as a SQLite varint.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn encode_varint(out: &mut Vec<u8>, value: u64) {
    if value < 128 {
        // Single byte, no continuation needed
        out.push(value as u8);
        return;
    }

    if value > EIGHT_GROUP_MAX {
        // Nine bytes: eight 7-bit groups then a full trailing byte.
        let mut v = value >> 8;
        let mut groups = [0u8; 8];
        for slot in groups.iter_mut().rev() {
            *slot = (v & 0x7f) as u8 | 0x80;
            v >>= 7;
        }
        out.extend_from_slice(&groups);
        out.push((value & 0xff) as u8);
        return;
    }

    // Extract 7-bit chunks starting from LSB, then reverse for big-endian
    let mut temp = [0u8; 8];
    let mut len = 0;
    let mut v = value;
    while v > 0 {
        temp[len] = (v & 0x7f) as u8;
        v >>= 7;
        len += 1;
    }

    for i in (0..len).rev() {
        if i == 0 {
            // Last byte: no continuation flag
            out.push(temp[i]);
        } else {
            out.push(temp[i] | 0x80);
        }
    }
}

/// Read a SQLite varint from a stream.
///
/// # Errors
///
/// `UnexpectedEof` if the stream ends inside the varint.
pub(crate) fn read_varint<R: Read>(source: &mut ByteSource<R>) -> Result<u64> {
    let mut value = 0u64;
    let mut consumed = 0;
    loop {
        let byte = source.read_byte()?;
        if consumed == 8 {
            return Ok((value << 8) | u64::from(byte));
        }
        value = (value << 7) | u64::from(byte & 0x7f);
        consumed += 1;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}
