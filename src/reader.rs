//! Streaming parser for SQLite changeset binary data.
//!
//! [`ChangesetReader`] pulls one [`ChangesetEntry`] at a time from any
//! [`Read`] source; nothing beyond the current table header and the record
//! being decoded is held in memory.
//!
//! # Binary Format
//!
//! The stream is a sequence of records, each introduced by a one-byte tag:
//!
//! ```text
//! Table Header:
//! ├── Marker: 'T' (0x54)
//! ├── Column count (varint)
//! ├── PK flags (1 byte per column: PK ordinal, 0 = not part of the PK)
//! └── Table name (null-terminated UTF-8)
//!
//! Change Record (belongs to the most recent table header):
//! ├── Operation code: INSERT=0x12, DELETE=0x09, UPDATE=0x17
//! ├── Indirect flag (1 byte, 0 or 1)
//! └── Values: INSERT new row | DELETE old row | UPDATE old row + new row
//! ```
//!
//! A reader that hits malformed input is poisoned: the failing call and
//! every later call return the same error, and no further bytes are consumed.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::encoding::{ByteSource, Value, decode_value, markers, op_codes, read_varint};
use crate::entry::{ChangesetEntry, Operation};
use crate::errors::{Error, FormatError, Result};
use crate::schema::TableSchema;

#[derive(Debug, Clone)]
enum State {
    Reading,
    Exhausted,
    Failed(Error),
}

/// Stateful streaming reader over a changeset.
pub struct ChangesetReader<R> {
    source: ByteSource<R>,
    config: ReaderConfig,
    table: Option<Arc<TableSchema>>,
    state: State,
    entries_read: u64,
    empty: bool,
}

impl<R> core::fmt::Debug for ChangesetReader<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangesetReader")
            .field("position", &self.source.position())
            .field("table", &self.table.as_deref().map(TableSchema::name))
            .field("state", &self.state)
            .field("entries_read", &self.entries_read)
            .finish_non_exhaustive()
    }
}

impl ChangesetReader<BufReader<File>> {
    /// Open a changeset file.
    ///
    /// The file handle is owned by the reader and closed when it is dropped.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be opened or read, `Format` if it does not
    /// start like a changeset.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Opening changeset {}", path.display());
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> ChangesetReader<R> {
    /// Bind a reader to a byte source using the default limits.
    ///
    /// Reads one byte of lookahead to check the stream signature. An empty
    /// source is a valid, empty changeset.
    ///
    /// # Errors
    ///
    /// * `Io` - the source failed.
    /// * `PatchsetUnsupported` - the stream is a patchset.
    /// * `RowBeforeTable` - the stream starts with a row record.
    /// * `InvalidTableMarker` - the stream starts with anything else.
    pub fn new(source: R) -> Result<Self> {
        Self::with_config(source, ReaderConfig::default())
    }

    /// Bind a reader to a byte source with explicit limits.
    ///
    /// # Errors
    ///
    /// See [`ChangesetReader::new`].
    pub fn with_config(source: R, config: ReaderConfig) -> Result<Self> {
        let mut reader = Self {
            source: ByteSource::new(source),
            config,
            table: None,
            state: State::Reading,
            entries_read: 0,
            empty: false,
        };
        reader.check_signature()?;
        tracing::debug!("Changeset reader bound (empty: {})", reader.empty);
        Ok(reader)
    }

    fn check_signature(&mut self) -> Result<()> {
        let position = self.source.position();
        match self.source.peek_byte()? {
            None => {
                self.empty = true;
                self.state = State::Exhausted;
                Ok(())
            }
            Some(markers::CHANGESET) => Ok(()),
            Some(markers::PATCHSET) => Err(FormatError::PatchsetUnsupported(position).into()),
            Some(byte) if op_codes::is_op_code(byte) => {
                Err(FormatError::RowBeforeTable(position).into())
            }
            Some(byte) => Err(FormatError::InvalidTableMarker(byte, position).into()),
        }
    }

    /// Advance to the next entry.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, and keeps doing so.
    ///
    /// # Errors
    ///
    /// `Io` on source failure, `Format` on malformed input. After an error the
    /// reader is poisoned and returns the same error on every call.
    pub fn next_entry(&mut self) -> Result<Option<ChangesetEntry>> {
        match &self.state {
            State::Failed(error) => return Err(error.clone()),
            State::Exhausted => return Ok(None),
            State::Reading => {}
        }

        match self.read_entry() {
            Ok(Some(entry)) => {
                self.entries_read += 1;
                Ok(Some(entry))
            }
            Ok(None) => {
                tracing::debug!(
                    "Changeset exhausted after {} entries ({} bytes)",
                    self.entries_read,
                    self.source.position()
                );
                self.state = State::Exhausted;
                Ok(None)
            }
            Err(error) => {
                tracing::warn!("Changeset reader failed: {}", error);
                self.state = State::Failed(error.clone());
                Err(error)
            }
        }
    }

    fn read_entry(&mut self) -> Result<Option<ChangesetEntry>> {
        loop {
            let position = self.source.position();
            let Some(tag) = self.source.next_byte()? else {
                return Ok(None);
            };

            match tag {
                markers::CHANGESET => {
                    let schema = self.read_table_header(position)?;
                    tracing::debug!(
                        "Table header for {} ({} columns) at position {}",
                        schema.name(),
                        schema.column_count(),
                        position
                    );
                    self.table = Some(Arc::new(schema));
                }
                markers::PATCHSET => {
                    return Err(FormatError::PatchsetUnsupported(position).into());
                }
                other => {
                    let operation = Operation::from_op_code(other)
                        .ok_or(FormatError::InvalidOpCode(other, position))?;
                    return self.read_row(operation, position).map(Some);
                }
            }
        }
    }

    fn read_table_header(&mut self, position: u64) -> Result<TableSchema> {
        let count_position = self.source.position();
        let column_count = read_varint(&mut self.source)?;
        if column_count == 0 {
            return Err(FormatError::ZeroColumns(position).into());
        }
        let column_count = match usize::try_from(column_count) {
            Ok(count) if count <= self.config.max_columns => count,
            _ => {
                return Err(FormatError::LimitExceeded {
                    what: "column count",
                    value: column_count,
                    limit: self.config.max_columns as u64,
                    position: count_position,
                }
                .into());
            }
        };

        let pk_flags = self.source.read_bytes(column_count)?;

        let name_position = self.source.position();
        let name = self
            .source
            .read_until_nul(self.config.max_table_name_len, "table name length")?;
        if name.is_empty() {
            return Err(FormatError::EmptyTableName(name_position).into());
        }
        let name =
            String::from_utf8(name).map_err(|_| FormatError::InvalidTableName(name_position))?;

        Ok(TableSchema::new(name, pk_flags)?)
    }

    fn read_row(&mut self, operation: Operation, position: u64) -> Result<ChangesetEntry> {
        let table = self
            .table
            .clone()
            .ok_or(FormatError::RowBeforeTable(position))?;

        let indirect_position = self.source.position();
        let indirect = match self.source.read_byte()? {
            0 => false,
            1 => true,
            other => return Err(FormatError::InvalidIndirectFlag(other, indirect_position).into()),
        };

        let column_count = table.column_count();
        let (old_values, new_values) = match operation {
            Operation::Insert => (Vec::new(), self.read_values(column_count)?),
            Operation::Delete => (self.read_values(column_count)?, Vec::new()),
            Operation::Update => {
                let old_values = self.read_values(column_count)?;
                let new_values = self.read_values(column_count)?;
                (old_values, new_values)
            }
        };

        if operation != Operation::Update {
            let image = if operation == Operation::Insert {
                &new_values
            } else {
                &old_values
            };
            if let Some(column) = image.iter().position(Value::is_undefined) {
                return Err(FormatError::UndefinedValue {
                    operation,
                    column,
                    position,
                }
                .into());
            }
        }

        Ok(
            ChangesetEntry::from_parts_unchecked(operation, table, old_values, new_values)
                .with_indirect(indirect),
        )
    }

    fn read_values(&mut self, count: usize) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(decode_value(&mut self.source, self.config.max_value_len)?);
        }
        Ok(values)
    }
}

impl<R> ChangesetReader<R> {
    /// The table header most recently read, if any.
    #[must_use]
    pub fn current_table(&self) -> Option<&Arc<TableSchema>> {
        self.table.as_ref()
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Number of entries yielded so far.
    #[must_use]
    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Whether the source contained no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// The limits this reader applies.
    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Borrow the underlying source.
    #[must_use]
    pub fn get_ref(&self) -> &R {
        self.source.get_ref()
    }

    /// Close the reader and hand back the underlying source.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}

impl<R: Read + Seek> ChangesetReader<R> {
    /// Seek the source back to offset 0 and start over.
    ///
    /// Clears the table context, the entry count and any poisoned state.
    ///
    /// # Errors
    ///
    /// Same as [`ChangesetReader::new`]; on error the reader stays poisoned.
    pub fn rewind(&mut self) -> Result<()> {
        let result = self.restart();
        if let Err(error) = &result {
            self.state = State::Failed(error.clone());
        }
        result
    }

    fn restart(&mut self) -> Result<()> {
        self.source.get_mut().seek(SeekFrom::Start(0))?;
        self.source.reset();
        self.table = None;
        self.entries_read = 0;
        self.empty = false;
        self.state = State::Reading;
        self.check_signature()
    }
}

impl<R: Read> Iterator for ChangesetReader<R> {
    type Item = Result<ChangesetEntry>;

    /// Yields each entry, then the error (once) if the stream is malformed.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Failed(_)) {
            return None;
        }
        self.next_entry().transpose()
    }
}

impl<R: Read> FusedIterator for ChangesetReader<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 'T', 2 columns, pk_flags [1, 0], table name "t\0"
    fn header() -> Vec<u8> {
        vec![b'T', 2, 1, 0, b't', 0]
    }

    fn push_int(data: &mut Vec<u8>, v: i64) {
        data.push(0x01);
        data.extend(&v.to_be_bytes());
    }

    fn push_text(data: &mut Vec<u8>, s: &str) {
        data.push(0x03);
        data.push(u8::try_from(s.len()).unwrap());
        data.extend(s.as_bytes());
    }

    #[test]
    fn test_parse_empty() {
        let mut reader = ChangesetReader::new(&[][..]).unwrap();
        assert!(reader.is_empty());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_parse_insert_changeset() {
        let mut data = header();
        data.extend([op_codes::INSERT, 0]);
        push_int(&mut data, 1);
        push_text(&mut data, "a");

        let mut reader = ChangesetReader::new(&data[..]).unwrap();
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.operation(), Operation::Insert);
        assert_eq!(entry.table().name(), "t");
        assert_eq!(entry.table().pk_flags(), &[1, 0]);
        assert!(entry.old_values().is_empty());
        assert_eq!(
            entry.new_values(),
            &[Value::Integer(1), Value::Text("a".into())]
        );
        assert!(!entry.is_indirect());
        assert!(reader.next_entry().unwrap().is_none());
        assert_eq!(reader.position(), data.len() as u64);
    }

    #[test]
    fn test_parse_delete_changeset() {
        let mut data = header();
        data.extend([op_codes::DELETE, 1]);
        push_int(&mut data, 1);
        push_text(&mut data, "a");

        let entry = ChangesetReader::new(&data[..])
            .unwrap()
            .next_entry()
            .unwrap()
            .unwrap();
        assert_eq!(entry.operation(), Operation::Delete);
        assert!(entry.new_values().is_empty());
        assert_eq!(entry.old_values().len(), 2);
        assert!(entry.is_indirect());
    }

    #[test]
    fn test_parse_update_changeset() {
        let mut data = header();
        data.extend([op_codes::UPDATE, 0]);
        // Old values: integer 1, text "a"
        push_int(&mut data, 1);
        push_text(&mut data, "a");
        // New values: undefined, text "b"
        data.push(0x00);
        push_text(&mut data, "b");

        let entry = ChangesetReader::new(&data[..])
            .unwrap()
            .next_entry()
            .unwrap()
            .unwrap();
        assert_eq!(entry.operation(), Operation::Update);
        assert_eq!(
            entry.old_values(),
            &[Value::Integer(1), Value::Text("a".into())]
        );
        assert_eq!(
            entry.new_values(),
            &[Value::Undefined, Value::Text("b".into())]
        );
    }

    #[test]
    fn test_table_switch_replaces_descriptor() {
        let mut data = header();
        data.extend([op_codes::INSERT, 0]);
        push_int(&mut data, 1);
        push_text(&mut data, "a");
        data.extend([b'T', 1, 1, b'u', 0]);
        data.extend([op_codes::DELETE, 0]);
        push_int(&mut data, 7);

        let mut reader = ChangesetReader::new(&data[..]).unwrap();
        let first = reader.next_entry().unwrap().unwrap();
        let second = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.table().name(), "t");
        assert_eq!(second.table().name(), "u");
        assert_eq!(second.table().column_count(), 1);
        assert_eq!(reader.current_table().unwrap().name(), "u");
        assert_eq!(reader.entries_read(), 2);
    }

    #[test]
    fn test_row_before_table() {
        let mut data = vec![op_codes::INSERT, 0];
        push_int(&mut data, 1);
        let error = ChangesetReader::new(&data[..]).unwrap_err();
        assert_eq!(error.as_format(), Some(&FormatError::RowBeforeTable(0)));
    }

    #[test]
    fn test_patchset_rejected() {
        let data = [b'P', 1, 1, b't', 0];
        let error = ChangesetReader::new(&data[..]).unwrap_err();
        assert_eq!(error.as_format(), Some(&FormatError::PatchsetUnsupported(0)));
    }

    #[test]
    fn test_invalid_signature() {
        let error = ChangesetReader::new(&b"SQLite format 3\0"[..]).unwrap_err();
        assert_eq!(
            error.as_format(),
            Some(&FormatError::InvalidTableMarker(b'S', 0))
        );
    }

    #[test]
    fn test_invalid_op_code() {
        let mut data = header();
        data.extend([0x42, 0]);
        let mut reader = ChangesetReader::new(&data[..]).unwrap();
        let error = reader.next_entry().unwrap_err();
        assert_eq!(error.as_format(), Some(&FormatError::InvalidOpCode(0x42, 6)));
    }

    #[test]
    fn test_invalid_indirect_flag() {
        let mut data = header();
        data.extend([op_codes::INSERT, 7]);
        let error = ChangesetReader::new(&data[..])
            .unwrap()
            .next_entry()
            .unwrap_err();
        assert_eq!(
            error.as_format(),
            Some(&FormatError::InvalidIndirectFlag(7, 7))
        );
    }

    #[test]
    fn test_zero_columns() {
        let data = [b'T', 0, b't', 0];
        let error = ChangesetReader::new(&data[..])
            .unwrap()
            .next_entry()
            .unwrap_err();
        assert_eq!(error.as_format(), Some(&FormatError::ZeroColumns(0)));
    }

    #[test]
    fn test_empty_table_name() {
        let data = [b'T', 1, 1, 0];
        let error = ChangesetReader::new(&data[..])
            .unwrap()
            .next_entry()
            .unwrap_err();
        assert_eq!(error.as_format(), Some(&FormatError::EmptyTableName(3)));
    }

    #[test]
    fn test_column_limit() {
        let data = [b'T', 0x81, 0x00, 1];
        let config = ReaderConfig::default().with_max_columns(64);
        let error = ChangesetReader::with_config(&data[..], config)
            .unwrap()
            .next_entry()
            .unwrap_err();
        assert_eq!(
            error.as_format(),
            Some(&FormatError::LimitExceeded {
                what: "column count",
                value: 128,
                limit: 64,
                position: 1
            })
        );
    }

    #[test]
    fn test_undefined_in_insert_rejected() {
        let mut data = header();
        data.extend([op_codes::INSERT, 0]);
        push_int(&mut data, 1);
        data.push(0x00);
        let error = ChangesetReader::new(&data[..])
            .unwrap()
            .next_entry()
            .unwrap_err();
        assert_eq!(
            error.as_format(),
            Some(&FormatError::UndefinedValue {
                operation: Operation::Insert,
                column: 1,
                position: 6
            })
        );
    }

    #[test]
    fn test_truncated_record_poisons_reader() {
        let mut data = header();
        data.extend([op_codes::INSERT, 0]);
        push_int(&mut data, 1);
        data.extend([0x03, 0x05, b'a']);

        let mut reader = ChangesetReader::new(&data[..]).unwrap();
        let first = reader.next_entry().unwrap_err();
        let position = reader.position();
        let second = reader.next_entry().unwrap_err();
        assert_eq!(first.as_format(), second.as_format());
        assert_eq!(reader.position(), position);
        assert!(matches!(
            first.as_format(),
            Some(FormatError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_iterator_yields_error_once() {
        let mut data = header();
        data.extend([op_codes::INSERT, 0]);
        push_int(&mut data, 1);
        push_text(&mut data, "a");
        data.extend([op_codes::INSERT, 0, 0x09]);

        let results: Vec<_> = ChangesetReader::new(&data[..]).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_rewind() {
        let mut data = header();
        data.extend([op_codes::INSERT, 0]);
        push_int(&mut data, 1);
        push_text(&mut data, "a");

        let mut reader = ChangesetReader::new(Cursor::new(data)).unwrap();
        let first = reader.next_entry().unwrap().unwrap();
        assert!(reader.next_entry().unwrap().is_none());

        reader.rewind().unwrap();
        assert!(reader.current_table().is_none());
        assert_eq!(reader.next_entry().unwrap().unwrap(), first);
        assert_eq!(reader.entries_read(), 1);
    }
}
