//! Reader configuration.

/// SQLite's compile-time ceiling on the number of columns in a table.
pub const DEFAULT_MAX_COLUMNS: usize = 32767;

/// SQLite's default `SQLITE_MAX_LENGTH`, the largest string or blob.
pub const DEFAULT_MAX_VALUE_LEN: usize = 1_000_000_000;

/// Longest table name accepted by default.
pub const DEFAULT_MAX_TABLE_NAME_LEN: usize = 4096;

/// Limits applied while parsing untrusted changeset bytes.
///
/// Every count or length read from the stream is checked against these
/// before anything is allocated for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Maximum number of columns a table header may declare
    pub max_columns: usize,
    /// Maximum byte length of a text or blob value
    pub max_value_len: usize,
    /// Maximum byte length of a table name
    pub max_table_name_len: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_columns: DEFAULT_MAX_COLUMNS,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            max_table_name_len: DEFAULT_MAX_TABLE_NAME_LEN,
        }
    }
}

impl ReaderConfig {
    /// Set the column limit.
    #[must_use]
    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    /// Set the text/blob length limit.
    #[must_use]
    pub fn with_max_value_len(mut self, max_value_len: usize) -> Self {
        self.max_value_len = max_value_len;
        self
    }

    /// Set the table name length limit.
    #[must_use]
    pub fn with_max_table_name_len(mut self, max_table_name_len: usize) -> Self {
        self.max_table_name_len = max_table_name_len;
        self
    }
}
