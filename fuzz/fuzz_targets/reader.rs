//! Fuzz test for the changeset reader.
//!
//! Arbitrary bytes are fed to the reader with tight limits. It must never
//! panic, and whatever it parses must survive re-encoding:
//! 1. A stream that parses cleanly re-encodes to bytes that parse to the same entries
//! 2. A failed reader keeps returning the same error

use geodiff_changeset::{ChangesetReader, ChangesetWriter, ReaderConfig};
use honggfuzz::fuzz;

fn main() {
    let config = ReaderConfig::default()
        .with_max_columns(256)
        .with_max_value_len(1 << 16)
        .with_max_table_name_len(256);

    loop {
        fuzz!(|data: &[u8]| {
            let Ok(mut reader) = ChangesetReader::with_config(data, config) else {
                return;
            };

            let mut entries = Vec::new();
            let failure = loop {
                match reader.next_entry() {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => break None,
                    Err(error) => break Some(error),
                }
            };

            if let Some(error) = failure {
                let again = reader.next_entry().expect_err("failed reader recovered");
                assert_eq!(error.as_format(), again.as_format());
                return;
            }

            let mut writer = ChangesetWriter::new(Vec::new());
            writer.write_all(&entries).expect("writing to a Vec cannot fail");
            let bytes = writer.finish().expect("flushing a Vec cannot fail");

            let reparsed: Vec<_> = ChangesetReader::new(&bytes[..])
                .expect("re-encoded changeset must open")
                .collect::<Result<_, _>>()
                .expect("re-encoded changeset must parse");
            assert_eq!(entries, reparsed);
        });
    }
}
