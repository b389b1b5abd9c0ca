#![doc = include_str!("../README.md")]
#![deny(clippy::mod_module_files)]

pub mod config;
pub mod encoding;
pub mod entry;
pub mod errors;
pub mod invert;
#[cfg(feature = "json")]
pub mod json;
pub mod reader;
pub mod schema;
pub mod summary;
#[cfg(feature = "testing")]
pub mod testing;
pub mod writer;

// Re-export main types
pub use config::ReaderConfig;
pub use encoding::{Value, bin2hex, hex2bin};
pub use entry::{ChangesetEntry, Operation, Reverse};
pub use invert::{invert_changeset, invert_changeset_bytes, invert_changeset_file};
#[cfg(feature = "json")]
pub use json::{
    changeset_to_json, changeset_to_json_summary, write_changeset_json,
    write_changeset_json_summary,
};
pub use reader::ChangesetReader;
pub use schema::TableSchema;
pub use summary::{ChangesetSummary, TableSummary, changes_count, has_changes};
pub use writer::{ChangesetWriter, encode_changeset};

// Re-export errors
pub use errors::{Error, FormatError, InvariantError, Result, Side};
