//! Per-table operation counts.

use std::io::Read;

use indexmap::IndexMap as IndexMapRaw;

use crate::entry::{ChangesetEntry, Operation};
use crate::errors::Result;
use crate::reader::ChangesetReader;

/// `IndexMap` alias using hashbrown's default hasher.
type IndexMap<K, V> = IndexMapRaw<K, V, hashbrown::DefaultHashBuilder>;

/// Operation counts for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TableSummary {
    /// Number of INSERT entries.
    pub insert: u64,
    /// Number of UPDATE entries.
    pub update: u64,
    /// Number of DELETE entries.
    pub delete: u64,
}

impl TableSummary {
    /// Sum of all three counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.insert + self.update + self.delete
    }
}

/// Operation counts per table, in the order tables first appear.
///
/// Only tables with at least one entry are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangesetSummary {
    tables: IndexMap<String, TableSummary>,
}

impl ChangesetSummary {
    /// Drain `reader` and count its entries.
    ///
    /// # Errors
    ///
    /// The first error the reader returns.
    pub fn from_reader<R: Read>(reader: &mut ChangesetReader<R>) -> Result<Self> {
        let mut summary = Self::default();
        while let Some(entry) = reader.next_entry()? {
            summary.record(&entry);
        }
        tracing::debug!(
            "Summarized {} entries over {} tables",
            summary.total(),
            summary.tables.len()
        );
        Ok(summary)
    }

    /// Count one entry.
    pub fn record(&mut self, entry: &ChangesetEntry) {
        let name = entry.table().name();
        let index = match self.tables.get_index_of(name) {
            Some(index) => index,
            None => self.tables.insert_full(name.to_owned(), TableSummary::default()).0,
        };
        let counts = &mut self.tables[index];
        match entry.operation() {
            Operation::Insert => counts.insert += 1,
            Operation::Update => counts.update += 1,
            Operation::Delete => counts.delete += 1,
        }
    }

    /// Counts for the table called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableSummary> {
        self.tables.get(name)
    }

    /// Iterate over `(table name, counts)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableSummary)> + '_ {
        self.tables
            .iter()
            .map(|(name, counts)| (name.as_str(), counts))
    }

    /// Number of tables with entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Total number of entries across all tables.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.tables.values().map(TableSummary::total).sum()
    }

    /// Whether no entry was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(feature = "json")]
impl serde::Serialize for ChangesetSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Count the entries remaining in `reader`.
///
/// # Errors
///
/// The first error the reader returns.
pub fn changes_count<R: Read>(reader: &mut ChangesetReader<R>) -> Result<u64> {
    let mut count = 0u64;
    while reader.next_entry()?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Whether `reader` has at least one more entry. Reads no further than the
/// first entry.
///
/// # Errors
///
/// The reader's error, if the first entry is malformed.
pub fn has_changes<R: Read>(reader: &mut ChangesetReader<R>) -> Result<bool> {
    Ok(reader.next_entry()?.is_some())
}
