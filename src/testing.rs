//! Testing utilities for bit-parity verification against rusqlite's session extension.
//!
//! This module is gated behind the `testing` feature.
//!
//! # Provided helpers
//!
//! - [`session_changeset`]: execute SQL in rusqlite and capture the raw changeset bytes
//! - [`reencode`]: read a changeset and write it back out through this crate
//! - [`byte_diff_report`]: locate the first byte where two buffers differ
//! - [`assert_bit_parity`]: assert that a session changeset survives re-encoding unchanged
//! - [`apply_changeset`]: apply changeset bytes to a connection
//! - [`get_all_rows`]: dump a table for state comparison

use core::fmt::Write;
use std::io::Cursor;

use rusqlite::Connection;
use rusqlite::session::Session;

use crate::{ChangesetReader, ChangesetWriter};

fn is_ddl(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("CREATE TABLE")
}

/// Execute a sequence of SQL statements against `conn` with session tracking
/// and return the raw changeset bytes.
///
/// DDL (`CREATE TABLE`) is executed before the session starts.
/// DML (`INSERT`/`UPDATE`/`DELETE`) is executed inside the session.
///
/// # Panics
///
/// Panics if any statement fails.
#[must_use]
pub fn session_changeset_on(conn: &Connection, statements: &[&str]) -> Vec<u8> {
    for &sql in statements.iter().filter(|sql| is_ddl(sql)) {
        conn.execute(sql, []).expect("DDL statement failed");
    }
    let mut session = Session::new(conn).expect("failed to create session");
    session
        .attach::<&str>(None)
        .expect("failed to attach session");
    for &sql in statements.iter().filter(|sql| !is_ddl(sql)) {
        conn.execute(sql, []).expect("DML statement failed");
    }
    let mut buf = Vec::new();
    session
        .changeset_strm(&mut buf)
        .expect("failed to extract changeset");
    buf
}

/// Like [`session_changeset_on`], against a fresh in-memory database.
///
/// # Panics
///
/// Panics if any statement fails.
#[must_use]
pub fn session_changeset(statements: &[&str]) -> Vec<u8> {
    let conn = Connection::open_in_memory().expect("failed to open database");
    session_changeset_on(&conn, statements)
}

/// Read `changeset` entry by entry and serialize it again.
///
/// # Errors
///
/// Returns the reader's error if `changeset` is malformed.
pub fn reencode(changeset: &[u8]) -> crate::Result<Vec<u8>> {
    let mut reader = ChangesetReader::new(changeset)?;
    let mut writer = ChangesetWriter::new(Vec::new());
    while let Some(entry) = reader.next_entry()? {
        writer.write_entry(&entry)?;
    }
    writer.finish()
}

/// Describe where two changeset buffers diverge, with a short hex window
/// around the first differing byte.
#[must_use]
pub fn byte_diff_report(label: &str, expected: &[u8], actual: &[u8]) -> String {
    if expected == actual {
        return format!("{label}: identical ({} bytes)", expected.len());
    }
    let mut report = format!(
        "{label}: {} bytes expected, {} bytes produced\n",
        expected.len(),
        actual.len()
    );
    match expected.iter().zip(actual).position(|(e, a)| e != a) {
        Some(offset) => {
            let end = (offset + 8).min(expected.len()).min(actual.len());
            let window = offset.saturating_sub(4)..end;
            let _ = writeln!(report, "  diverges at offset {offset}");
            let _ = writeln!(report, "  expected {:02x?}", &expected[window.clone()]);
            let _ = writeln!(report, "  produced {:02x?}", &actual[window]);
        }
        None => report.push_str("  one buffer is a prefix of the other\n"),
    }
    report
}

/// Capture the changeset of `sql_statements` and assert that reading and
/// re-writing it reproduces the same bytes. Returns the captured changeset.
///
/// # Panics
///
/// Panics with a detailed diff report if the bytes don't match.
pub fn assert_bit_parity(sql_statements: &[&str]) -> Vec<u8> {
    let sqlite_changeset = session_changeset(sql_statements);
    let ours = reencode(&sqlite_changeset).expect("session changeset failed to parse");

    assert!(
        sqlite_changeset == ours,
        "Bit parity failure!\n\n{}\n\nSQL:\n{}",
        byte_diff_report("changeset", &sqlite_changeset, &ours),
        sql_statements.join("\n")
    );
    sqlite_changeset
}

/// Apply a changeset to a database connection.
///
/// Uses `SQLITE_CHANGESET_ABORT` on conflict.
///
/// # Errors
///
/// Returns an error if the changeset application fails.
pub fn apply_changeset(conn: &Connection, changeset: &[u8]) -> Result<(), rusqlite::Error> {
    use rusqlite::session::{ChangesetItem, ConflictAction, ConflictType};
    let mut cursor = Cursor::new(changeset);
    conn.apply_strm(
        &mut cursor,
        None::<fn(&str) -> bool>,
        |_conflict_type: ConflictType, _item: ChangesetItem| ConflictAction::SQLITE_CHANGESET_ABORT,
    )
}

/// Dump every row of `table`, formatted and sorted, for state comparison.
///
/// # Panics
///
/// Panics if the table cannot be queried.
#[must_use]
pub fn get_all_rows(conn: &Connection, table: &str) -> Vec<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {table}"))
        .expect("failed to prepare row dump");
    let columns = stmt.column_count();
    let mut rows: Vec<Vec<String>> = stmt
        .query_map([], |row| {
            (0..columns)
                .map(|i| row.get::<_, rusqlite::types::Value>(i).map(|v| format!("{v:?}")))
                .collect::<rusqlite::Result<Vec<String>>>()
        })
        .expect("failed to query rows")
        .collect::<Result<_, _>>()
        .expect("failed to read row");
    rows.sort();
    rows
}
