//! Table descriptors shared by the entries of one table section.

use crate::errors::InvariantError;

/// A table schema as declared by a changeset table header.
///
/// Entries reference their schema through an `Arc`, so a descriptor stays
/// alive for as long as any entry produced under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableSchema {
    name: String,
    /// Primary key flags - raw bytes from the changeset.
    ///
    /// Each byte represents the 1-based ordinal position in the composite PK,
    /// or 0 if the column is not part of the primary key.
    /// For example, `[1, 0, 2]` means column 0 is the first PK column,
    /// column 1 is not a PK column, and column 2 is the second PK column.
    pk_flags: Vec<u8>,
}

impl TableSchema {
    /// Create a new table schema with one PK flag byte per column.
    ///
    /// # Errors
    ///
    /// * `EmptyTableName` - the name is empty.
    /// * `NulInTableName` - the name contains a NUL byte, which would end it early on the wire.
    /// * `ZeroColumns` - `pk_flags` is empty.
    pub fn new(name: impl Into<String>, pk_flags: Vec<u8>) -> Result<Self, InvariantError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvariantError::EmptyTableName);
        }
        if name.contains('\0') {
            return Err(InvariantError::NulInTableName(name));
        }
        if pk_flags.is_empty() {
            return Err(InvariantError::ZeroColumns(name));
        }
        Ok(Self { name, pk_flags })
    }

    /// Create a schema from a boolean primary key mask.
    ///
    /// PK ordinals are assigned in column order.
    ///
    /// # Errors
    ///
    /// Same as [`TableSchema::new`].
    pub fn with_primary_keys(
        name: impl Into<String>,
        primary_keys: &[bool],
    ) -> Result<Self, InvariantError> {
        let mut ordinal = 0u8;
        let pk_flags = primary_keys
            .iter()
            .map(|&is_pk| {
                if is_pk {
                    ordinal = ordinal.saturating_add(1);
                    ordinal
                } else {
                    0
                }
            })
            .collect();
        Self::new(name, pk_flags)
    }

    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.pk_flags.len()
    }

    /// The raw PK flag bytes, one per column.
    #[must_use]
    pub fn pk_flags(&self) -> &[u8] {
        &self.pk_flags
    }

    /// Whether column `column` is part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self, column: usize) -> bool {
        self.pk_flags.get(column).is_some_and(|&flag| flag > 0)
    }

    /// The boolean primary key mask.
    pub fn primary_keys(&self) -> impl Iterator<Item = bool> + '_ {
        self.pk_flags.iter().map(|&flag| flag > 0)
    }

    /// Get the indices of primary key columns, in PK order.
    #[must_use]
    pub fn pk_indices(&self) -> Vec<usize> {
        let mut pk_cols: Vec<(usize, u8)> = self
            .pk_flags
            .iter()
            .enumerate()
            .filter(|&(_, &pk_ordinal)| pk_ordinal > 0)
            .map(|(i, &pk_ordinal)| (i, pk_ordinal))
            .collect();
        // Sort by pk_ordinal to get correct PK order
        pk_cols.sort_by_key(|&(_, ordinal)| ordinal);
        pk_cols.into_iter().map(|(idx, _)| idx).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pk_indices_follow_ordinals() {
        let schema = TableSchema::new("users", vec![2, 0, 1]).unwrap();
        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.pk_indices(), vec![2, 0]);
        assert!(schema.is_primary_key(0));
        assert!(!schema.is_primary_key(1));
        assert!(!schema.is_primary_key(7));
    }

    #[test]
    fn test_with_primary_keys() {
        let schema = TableSchema::with_primary_keys("simple", &[true, false, false, false]).unwrap();
        assert_eq!(schema.pk_flags(), &[1, 0, 0, 0]);
        assert_eq!(
            schema.primary_keys().collect::<Vec<_>>(),
            vec![true, false, false, false]
        );
    }

    #[test]
    fn test_invalid_schemas() {
        assert_eq!(
            TableSchema::new("", vec![1]),
            Err(InvariantError::EmptyTableName)
        );
        assert_eq!(
            TableSchema::new("a\0b", vec![1]),
            Err(InvariantError::NulInTableName("a\0b".into()))
        );
        assert_eq!(
            TableSchema::new("t", Vec::new()),
            Err(InvariantError::ZeroColumns("t".into()))
        );
    }
}
