//! Hex text encoding for blob values.
//!
//! Blobs cannot travel inside JSON strings as raw bytes, so they are rendered
//! as two uppercase hex digits per byte, most significant nibble first, with
//! no prefix and no separators. Decoding accepts either case.

use crate::errors::FormatError;

/// Encode bytes as uppercase hex.
///
/// ```
/// assert_eq!(geodiff_changeset::bin2hex(b"A\xff"), "41FF");
/// assert_eq!(geodiff_changeset::bin2hex(b""), "");
/// ```
#[must_use]
pub fn bin2hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Decode hex text (either case) back into bytes.
///
/// ```
/// assert_eq!(geodiff_changeset::hex2bin("41ff").unwrap(), b"A\xff");
/// ```
///
/// # Errors
///
/// * `OddHexLength` - the text has an odd number of bytes.
/// * `InvalidHexCharacter` - a byte of the text is not a hex digit.
pub fn hex2bin(text: &str) -> Result<Vec<u8>, FormatError> {
    if text.len() % 2 != 0 {
        return Err(FormatError::OddHexLength(text.len()));
    }
    hex::decode(text).map_err(|error| match error {
        hex::FromHexError::InvalidHexCharacter { c, index } => FormatError::InvalidHexCharacter {
            character: c,
            index,
        },
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            FormatError::OddHexLength(text.len())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_literals() {
        assert_eq!(bin2hex(b"A\xff"), "41FF");
        assert_eq!(hex2bin("41FF").unwrap(), b"A\xff");
        assert_eq!(hex2bin("41ff").unwrap(), b"A\xff");
    }

    #[test]
    fn test_empty() {
        assert_eq!(bin2hex(&[]), "");
        assert_eq!(hex2bin("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_every_byte_roundtrips() {
        let all: Vec<u8> = (0..=255).collect();
        let text = bin2hex(&all);
        assert_eq!(text.len(), 512);
        assert!(text.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        assert_eq!(hex2bin(&text).unwrap(), all);
    }

    #[test]
    fn test_decode_normalizes_to_uppercase() {
        let mixed = "deadBEEF00";
        assert_eq!(bin2hex(&hex2bin(mixed).unwrap()), mixed.to_uppercase());
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(hex2bin("ABC"), Err(FormatError::OddHexLength(3)));
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            hex2bin("41G0"),
            Err(FormatError::InvalidHexCharacter {
                character: 'G',
                index: 2
            })
        );
        assert!(hex2bin("0x41").is_err());
    }
}
