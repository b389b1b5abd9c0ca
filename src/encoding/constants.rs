//! Constants for the SQLite changeset binary format.

/// Operation codes used in the binary format.
///
/// These are SQLite's `SQLITE_INSERT`, `SQLITE_DELETE` and `SQLITE_UPDATE`
/// authorizer codes, which the session extension reuses as record tags.
pub mod op_codes {
    /// INSERT operation code.
    pub const INSERT: u8 = 0x12;
    /// DELETE operation code.
    pub const DELETE: u8 = 0x09;
    /// UPDATE operation code.
    pub const UPDATE: u8 = 0x17;

    /// Returns true if `byte` is one of the row operation codes.
    #[must_use]
    pub const fn is_op_code(byte: u8) -> bool {
        matches!(byte, INSERT | DELETE | UPDATE)
    }
}

/// Table format markers.
pub mod markers {
    /// Changeset table marker ('T').
    pub const CHANGESET: u8 = b'T';
    /// Patchset table marker ('P'). Recognised only to be rejected.
    pub const PATCHSET: u8 = b'P';
}

/// Type codes of a value slot.
pub mod value_types {
    /// Column not recorded in this image.
    pub const UNDEFINED: u8 = 0x00;
    /// 8 bytes big-endian i64.
    pub const INTEGER: u8 = 0x01;
    /// 8 bytes big-endian IEEE 754.
    pub const DOUBLE: u8 = 0x02;
    /// Varint length + UTF-8 bytes.
    pub const TEXT: u8 = 0x03;
    /// Varint length + raw bytes.
    pub const BLOB: u8 = 0x04;
    /// SQL NULL, no payload.
    pub const NULL: u8 = 0x05;
}
