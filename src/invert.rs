//! Changeset inversion.
//!
//! Applying the inverse of a changeset to a database undoes the original:
//! every entry is reversed (see [`Reverse`]) and written in the same order.

use std::io::{Read, Write};
use std::path::Path;

use crate::entry::Reverse;
use crate::errors::Result;
use crate::reader::ChangesetReader;
use crate::writer::ChangesetWriter;

/// Drain `reader`, writing the inverse of each entry to `writer`.
///
/// Returns the number of entries inverted. The writer is not finished, so
/// more entries may follow.
///
/// Inverting twice reproduces the input bytes when every table header starts
/// a new run of entries, which is how SQLite writes changesets. A header that
/// repeats the table already in effect is dropped by the writer, so such a
/// stream comes back shorter with the same entries.
///
/// Text values must be valid UTF-8 (see [`Value::Text`](crate::Value::Text)).
/// A changeset carrying non-UTF-8 text aborts with `InvalidUtf8` at that slot.
///
/// # Errors
///
/// The first reader or writer error. Entries inverted before the failure have
/// already been handed to the writer.
pub fn invert_changeset<R: Read, W: Write>(
    reader: &mut ChangesetReader<R>,
    writer: &mut ChangesetWriter<W>,
) -> Result<u64> {
    let mut inverted = 0u64;
    while let Some(entry) = reader.next_entry()? {
        writer.write_entry(&entry.reverse())?;
        inverted += 1;
    }
    tracing::debug!("Inverted {} changeset entries", inverted);
    Ok(inverted)
}

/// Invert an in-memory changeset.
///
/// ```
/// use geodiff_changeset::invert_changeset_bytes;
///
/// assert!(invert_changeset_bytes(&[]).unwrap().is_empty());
/// ```
///
/// # Errors
///
/// `Format` if `changeset` is malformed.
pub fn invert_changeset_bytes(changeset: &[u8]) -> Result<Vec<u8>> {
    let mut reader = ChangesetReader::new(changeset)?;
    let mut writer = ChangesetWriter::new(Vec::new());
    invert_changeset(&mut reader, &mut writer)?;
    writer.finish()
}

/// Invert the changeset file at `input` into a new file at `output`.
///
/// Returns the number of entries inverted.
///
/// # Errors
///
/// `Io` if either file cannot be opened, read or written; `Format` if the
/// input is malformed. On error `output` may hold a partial changeset.
pub fn invert_changeset_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<u64> {
    let mut reader = ChangesetReader::open(input)?;
    let mut writer = ChangesetWriter::create(output)?;
    let inverted = invert_changeset(&mut reader, &mut writer)?;
    writer.finish()?;
    Ok(inverted)
}
