//! JSON rendering of changesets.
//!
//! # Format
//!
//! [`changeset_to_json`] renders a pretty-printed array with one object per
//! entry, in stream order:
//!
//! ```json
//! [
//!   {
//!     "table": "simple",
//!     "type": "update",
//!     "old": [1, {"undefined": true}, "before"],
//!     "new": [{"undefined": true}, {"blob": "00FF"}, "after"]
//!   }
//! ]
//! ```
//!
//! `indirect` appears (as `true`) only for indirect changes; `old` is absent
//! for inserts and `new` for deletes. Values map as follows:
//!
//! | Value                      | JSON                              |
//! |----------------------------|-----------------------------------|
//! | `Null`                     | `null`                            |
//! | `Integer`                  | number                            |
//! | `Double` (finite)          | number                            |
//! | `Double` (NaN, ±infinity)  | `{"double": "NaN"\|"inf"\|"-inf"}` |
//! | `Text`                     | string                            |
//! | `Blob`                     | `{"blob": "<uppercase hex>"}`     |
//! | `Undefined`                | `{"undefined": true}`             |
//!
//! [`changeset_to_json_summary`] renders per-table counts instead:
//! `{"simple": {"insert": 1, "update": 0, "delete": 2}}`.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};

use crate::encoding::{Value, bin2hex};
use crate::entry::{ChangesetEntry, Operation};
use crate::errors::Result;
use crate::reader::ChangesetReader;
use crate::summary::ChangesetSummary;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        match self {
            Value::Undefined => tagged(serializer, "undefined", &true),
            Value::Null => serializer.serialize_unit(),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Double(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Double(v) if v.is_nan() => tagged(serializer, "double", "NaN"),
            Value::Double(v) if v.is_sign_positive() => tagged(serializer, "double", "inf"),
            Value::Double(_) => tagged(serializer, "double", "-inf"),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Blob(v) => tagged(serializer, "blob", &bin2hex(v)),
        }
    }
}

/// A single-key object marking a value JSON has no native form for.
fn tagged<S: Serializer, T: Serialize + ?Sized>(
    serializer: S,
    key: &str,
    value: &T,
) -> core::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

#[derive(Serialize)]
struct EntryJson<'a> {
    table: &'a str,
    #[serde(rename = "type")]
    operation: Operation,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    indirect: bool,
    #[serde(skip_serializing_if = "is_empty")]
    old: &'a [Value],
    #[serde(skip_serializing_if = "is_empty")]
    new: &'a [Value],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_empty(values: &&[Value]) -> bool {
    values.is_empty()
}

impl<'a> From<&'a ChangesetEntry> for EntryJson<'a> {
    fn from(entry: &'a ChangesetEntry) -> Self {
        Self {
            table: entry.table().name(),
            operation: entry.operation(),
            indirect: entry.is_indirect(),
            old: entry.old_values(),
            new: entry.new_values(),
        }
    }
}

/// Stream every remaining entry of `reader` to `writer` as a pretty-printed
/// JSON array. Returns the number of entries written.
///
/// # Errors
///
/// The first reader error, or `Json` if writing fails. Output already written
/// is left in `writer`, so it may hold an unterminated array.
pub fn write_changeset_json<R: Read, W: Write>(
    reader: &mut ChangesetReader<R>,
    writer: W,
) -> Result<u64> {
    let mut serializer = serde_json::Serializer::pretty(writer);
    let mut seq = serializer.serialize_seq(None)?;
    let mut count = 0u64;
    while let Some(entry) = reader.next_entry()? {
        seq.serialize_element(&EntryJson::from(&entry))?;
        count += 1;
    }
    SerializeSeq::end(seq)?;
    tracing::debug!("Exported {} changeset entries as JSON", count);
    Ok(count)
}

/// Write the per-table operation counts of `reader` to `writer` as a
/// pretty-printed JSON object, tables in first-seen order.
///
/// # Errors
///
/// The first reader error (nothing is written in that case), or `Json` if
/// writing fails.
pub fn write_changeset_json_summary<R: Read, W: Write>(
    reader: &mut ChangesetReader<R>,
    writer: W,
) -> Result<()> {
    let summary = ChangesetSummary::from_reader(reader)?;
    let mut serializer = serde_json::Serializer::pretty(writer);
    summary.serialize(&mut serializer)?;
    Ok(())
}

/// Render every remaining entry of `reader` as a pretty-printed JSON array.
///
/// ```
/// use geodiff_changeset::{ChangesetReader, changeset_to_json};
///
/// let mut reader = ChangesetReader::new(&[][..]).unwrap();
/// assert_eq!(changeset_to_json(&mut reader).unwrap(), "[]");
/// ```
///
/// # Errors
///
/// See [`write_changeset_json`].
pub fn changeset_to_json<R: Read>(reader: &mut ChangesetReader<R>) -> Result<String> {
    let mut out = Vec::new();
    write_changeset_json(reader, &mut out)?;
    into_string(out)
}

/// Render the per-table operation counts of `reader` as a pretty-printed
/// JSON object.
///
/// # Errors
///
/// See [`write_changeset_json_summary`].
pub fn changeset_to_json_summary<R: Read>(reader: &mut ChangesetReader<R>) -> Result<String> {
    let mut out = Vec::new();
    write_changeset_json_summary(reader, &mut out)?;
    into_string(out)
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error).into())
}
