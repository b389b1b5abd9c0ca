//! Streaming serializer producing SQLite changeset binary data.
//!
//! [`ChangesetWriter`] appends entries to any [`Write`] sink. A table header
//! is emitted only when an entry's table differs from the previous entry's,
//! so entries grouped by table produce exactly one header per group, which is
//! the layout the reader consumes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::encoding::{Value, encode_value, encode_varint, markers};
use crate::entry::{ChangesetEntry, Operation};
use crate::errors::Result;
use crate::schema::TableSchema;

/// Stateful streaming writer.
pub struct ChangesetWriter<W: Write> {
    sink: W,
    table: Option<Arc<TableSchema>>,
    scratch: Vec<u8>,
    entries_written: u64,
    bytes_written: u64,
}

impl<W: Write> core::fmt::Debug for ChangesetWriter<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangesetWriter")
            .field("table", &self.table.as_deref().map(TableSchema::name))
            .field("entries_written", &self.entries_written)
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

impl ChangesetWriter<BufWriter<File>> {
    /// Create (or truncate) a changeset file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Creating changeset {}", path.display());
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ChangesetWriter<W> {
    /// Bind a writer to a sink. Nothing is written until the first entry.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            table: None,
            scratch: Vec::new(),
            entries_written: 0,
            bytes_written: 0,
        }
    }

    /// Append one entry, preceded by a table header if its table differs from
    /// the previous entry's.
    ///
    /// Each record is staged in memory and handed to the sink in a single
    /// `write_all`, so a failing sink never sees half a record from this call.
    ///
    /// # Errors
    ///
    /// `Io` if the sink fails.
    pub fn write_entry(&mut self, entry: &ChangesetEntry) -> Result<()> {
        self.scratch.clear();

        let table = entry.table();
        let same_table = self
            .table
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, table) || **current == **table);
        if !same_table {
            write_table_header(&mut self.scratch, table);
        }

        self.scratch.push(entry.operation().op_code());
        self.scratch.push(u8::from(entry.is_indirect()));
        match entry.operation() {
            Operation::Insert => write_values(&mut self.scratch, entry.new_values()),
            Operation::Delete => write_values(&mut self.scratch, entry.old_values()),
            Operation::Update => {
                write_values(&mut self.scratch, entry.old_values());
                write_values(&mut self.scratch, entry.new_values());
            }
        }

        self.sink.write_all(&self.scratch)?;

        if !same_table {
            tracing::debug!(
                "Table header for {} ({} columns) at position {}",
                table.name(),
                table.column_count(),
                self.bytes_written
            );
            self.table = Some(Arc::clone(table));
        }
        self.bytes_written += self.scratch.len() as u64;
        self.entries_written += 1;
        Ok(())
    }

    /// Append every entry of an iterator.
    ///
    /// # Errors
    ///
    /// `Io` if the sink fails.
    pub fn write_all<'a>(
        &mut self,
        entries: impl IntoIterator<Item = &'a ChangesetEntry>,
    ) -> Result<()> {
        for entry in entries {
            self.write_entry(entry)?;
        }
        Ok(())
    }

    /// Number of entries written so far.
    #[must_use]
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Number of bytes handed to the sink so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Borrow the underlying sink.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Flush the sink and hand it back.
    ///
    /// # Errors
    ///
    /// `Io` if flushing fails.
    pub fn finish(mut self) -> Result<W> {
        self.sink.flush()?;
        tracing::debug!(
            "Changeset finished: {} entries, {} bytes",
            self.entries_written,
            self.bytes_written
        );
        Ok(self.sink)
    }
}

/// Serialize a sequence of entries into an in-memory changeset.
///
/// # Errors
///
/// Never fails in practice; `Vec<u8>` is an infallible sink.
pub fn encode_changeset<'a>(
    entries: impl IntoIterator<Item = &'a ChangesetEntry>,
) -> Result<Vec<u8>> {
    let mut writer = ChangesetWriter::new(Vec::new());
    writer.write_all(entries)?;
    writer.finish()
}

fn write_table_header(out: &mut Vec<u8>, table: &TableSchema) {
    out.push(markers::CHANGESET);
    encode_varint(out, table.column_count() as u64);
    out.extend_from_slice(table.pk_flags());
    out.extend_from_slice(table.name().as_bytes());
    out.push(0);
}

fn write_values(out: &mut Vec<u8>, values: &[Value]) {
    for value in values {
        encode_value(out, value);
    }
}
