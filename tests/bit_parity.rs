//! Bit-for-bit parity tests against rusqlite's session extension.
//!
//! These tests capture real changesets from SQLite and verify that:
//! - Every entry is read with the values SQLite recorded
//! - Writing the parsed entries back out is **byte-identical** to SQLite's output
//! - Applying an inverted changeset undoes the original
#![cfg(feature = "testing")]

use geodiff_changeset::testing::{
    apply_changeset, assert_bit_parity, byte_diff_report, get_all_rows, session_changeset_on,
};
use geodiff_changeset::{
    ChangesetReader, Operation, Result, Value, changes_count, invert_changeset_bytes,
};
use rusqlite::Connection;

// =============================================================================
// Re-encoding parity
// =============================================================================

#[test]
fn bit_parity_single_insert() {
    assert_bit_parity(&[
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)",
        "INSERT INTO users (id, name) VALUES (1, 'Alice')",
    ]);
}

#[test]
fn bit_parity_all_value_types() {
    let changeset = assert_bit_parity(&[
        "CREATE TABLE t (id INTEGER PRIMARY KEY, i INTEGER, r REAL, s TEXT, b BLOB, n TEXT)",
        "INSERT INTO t VALUES (1, -9223372036854775808, 3.5, 'héllo', X'00FF10', NULL)",
    ]);

    let entries: Vec<_> = ChangesetReader::new(&changeset[..])
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation(), Operation::Insert);
    assert_eq!(entries[0].table().name(), "t");
    assert_eq!(entries[0].table().pk_flags(), &[1, 0, 0, 0, 0, 0]);
    assert_eq!(
        entries[0].new_values(),
        &[
            Value::Integer(1),
            Value::Integer(i64::MIN),
            Value::Double(3.5),
            Value::from("héllo"),
            Value::Blob(vec![0x00, 0xFF, 0x10]),
            Value::Null,
        ]
    );
}

#[test]
fn bit_parity_update_records_changed_columns_only() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE simple (fid INTEGER PRIMARY KEY, name TEXT, rating INTEGER);
         INSERT INTO simple VALUES (2, 'feature2', 2);",
    )
    .unwrap();
    let changeset = session_changeset_on(&conn, &["UPDATE simple SET rating = 9999 WHERE fid = 2"]);

    let entries: Vec<_> = ChangesetReader::new(&changeset[..])
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(entries.len(), 1);
    let update = &entries[0];
    assert_eq!(update.operation(), Operation::Update);
    assert_eq!(
        update.old_values(),
        &[Value::Integer(2), Value::Undefined, Value::Integer(2)]
    );
    assert_eq!(
        update.new_values(),
        &[Value::Undefined, Value::Undefined, Value::Integer(9999)]
    );

    // The inverse swaps images wholesale and double inversion is exact.
    let inverted = invert_changeset_bytes(&changeset).unwrap();
    assert_eq!(invert_changeset_bytes(&inverted).unwrap(), changeset);
}

#[test]
fn bit_parity_multiple_tables() {
    let changeset = assert_bit_parity(&[
        "CREATE TABLE a (id INTEGER PRIMARY KEY, v TEXT)",
        "CREATE TABLE b (x TEXT, y INTEGER, PRIMARY KEY (y, x))",
        "INSERT INTO a VALUES (1, 'one')",
        "INSERT INTO b VALUES ('k', 7)",
        "INSERT INTO a VALUES (2, 'two')",
        "INSERT INTO b VALUES ('j', 8)",
    ]);
    let mut reader = ChangesetReader::new(&changeset[..]).unwrap();
    assert_eq!(changes_count(&mut reader).unwrap(), 4);
}

#[test]
fn bit_parity_composite_primary_key_ordinals() {
    let changeset = assert_bit_parity(&[
        "CREATE TABLE b (x TEXT, y INTEGER, z REAL, PRIMARY KEY (y, x))",
        "INSERT INTO b VALUES ('k', 7, 0.5)",
    ]);
    let entry = ChangesetReader::new(&changeset[..])
        .unwrap()
        .next_entry()
        .unwrap()
        .unwrap();
    assert_eq!(entry.table().pk_flags(), &[2, 1, 0]);
    assert_eq!(entry.table().pk_indices(), vec![1, 0]);
}

#[test]
fn bit_parity_long_text_and_blob() {
    let text = "x".repeat(5000);
    let insert = format!("INSERT INTO t VALUES (1, '{text}', zeroblob(70000))");
    assert_bit_parity(&["CREATE TABLE t (id INTEGER PRIMARY KEY, s TEXT, b BLOB)", &insert]);
}

// =============================================================================
// Applying inverted changesets
// =============================================================================

const SCHEMA: &str = "CREATE TABLE simple (fid INTEGER PRIMARY KEY, name TEXT, rating REAL);
     INSERT INTO simple VALUES (1, 'feature1', 1.5);
     INSERT INTO simple VALUES (2, 'feature2', 2.0);
     INSERT INTO simple VALUES (3, NULL, NULL);";

#[test]
fn test_inverted_changeset_restores_database() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    let before = get_all_rows(&conn, "simple");

    let changeset = session_changeset_on(
        &conn,
        &[
            "DELETE FROM simple WHERE fid = 2",
            "INSERT INTO simple VALUES (4, 'my new point A', 1.0)",
            "DELETE FROM simple WHERE fid = 3",
        ],
    );
    let after = get_all_rows(&conn, "simple");
    assert_ne!(before, after);

    let inverted = invert_changeset_bytes(&changeset).unwrap();
    apply_changeset(&conn, &inverted).unwrap();
    assert_eq!(get_all_rows(&conn, "simple"), before);

    apply_changeset(&conn, &changeset).unwrap();
    assert_eq!(get_all_rows(&conn, "simple"), after);
}

#[test]
fn test_reencoded_changeset_applies_like_original() {
    let source = Connection::open_in_memory().unwrap();
    source.execute_batch(SCHEMA).unwrap();
    let changeset = session_changeset_on(
        &source,
        &["INSERT INTO simple VALUES (10, 'ten', 10.0)", "DELETE FROM simple WHERE fid = 1"],
    );

    let target = Connection::open_in_memory().unwrap();
    target.execute_batch(SCHEMA).unwrap();
    let reencoded = geodiff_changeset::testing::reencode(&changeset).unwrap();
    apply_changeset(&target, &reencoded).unwrap();
    assert_eq!(get_all_rows(&target, "simple"), get_all_rows(&source, "simple"));
}

// =============================================================================
// Helpers
// =============================================================================

#[test]
fn test_get_all_rows_is_sorted_and_typed() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    let rows = get_all_rows(&conn, "simple");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["Integer(1)", "Text(\"feature1\")", "Real(1.5)"]);
    assert_eq!(rows[2], vec!["Integer(3)", "Null", "Null"]);
}

#[test]
fn test_byte_diff_report_locates_divergence() {
    assert_eq!(byte_diff_report("same", &[1, 2], &[1, 2]), "same: identical (2 bytes)");
    let report = byte_diff_report("cs", &[1, 2, 3, 4], &[1, 2, 9, 4, 5]);
    assert!(report.contains("4 bytes expected, 5 bytes produced"));
    assert!(report.contains("diverges at offset 2"));
    assert!(byte_diff_report("cs", &[1], &[1, 2]).contains("prefix"));
}
