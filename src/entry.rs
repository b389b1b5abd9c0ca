//! Row-change records and their inversion.
//!
//! A [`ChangesetEntry`] is one INSERT, UPDATE or DELETE of a single row,
//! holding the values of the pre-image (`old_values`) and of the post-image
//! (`new_values`). The shape of the two images depends on the operation:
//!
//! | Operation | `old_values`              | `new_values`              |
//! |-----------|---------------------------|---------------------------|
//! | INSERT    | empty                     | one defined value per col |
//! | DELETE    | one defined value per col | empty                     |
//! | UPDATE    | one slot per column       | one slot per column       |
//!
//! In updates a slot may be [`Value::Undefined`]: the producer did not record
//! that column in that image. Which columns get recorded is the producer's
//! choice and is preserved exactly, never filled in.

use std::sync::Arc;

use crate::encoding::{Value, op_codes};
use crate::errors::{InvariantError, Side};
use crate::schema::TableSchema;

/// The type of database operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "json",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum Operation {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl Operation {
    /// The record tag used on the wire.
    #[must_use]
    pub const fn op_code(self) -> u8 {
        match self {
            Operation::Insert => op_codes::INSERT,
            Operation::Update => op_codes::UPDATE,
            Operation::Delete => op_codes::DELETE,
        }
    }

    /// Parse a record tag.
    #[must_use]
    pub const fn from_op_code(code: u8) -> Option<Self> {
        match code {
            op_codes::INSERT => Some(Operation::Insert),
            op_codes::UPDATE => Some(Operation::Update),
            op_codes::DELETE => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Canonical lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Operation::Insert => f.write_str("INSERT"),
            Operation::Update => f.write_str("UPDATE"),
            Operation::Delete => f.write_str("DELETE"),
        }
    }
}

/// Trait for reversing operations.
pub trait Reverse {
    /// The reverse of this operation.
    type Output;

    /// Returns the reverse of this operation.
    fn reverse(self) -> Self::Output;
}

impl Reverse for Operation {
    type Output = Operation;

    fn reverse(self) -> Self::Output {
        match self {
            Operation::Insert => Operation::Delete,
            Operation::Delete => Operation::Insert,
            Operation::Update => Operation::Update,
        }
    }
}

/// One parsed row-change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetEntry {
    operation: Operation,
    table: Arc<TableSchema>,
    indirect: bool,
    old_values: Vec<Value>,
    new_values: Vec<Value>,
}

impl ChangesetEntry {
    /// Create an entry, checking the image shapes against the table.
    ///
    /// # Errors
    ///
    /// * `UnexpectedValues` - an INSERT with old values or a DELETE with new values.
    /// * `ColumnCountMismatch` - an image that does not have one value per column.
    /// * `UndefinedValue` - an INSERT or DELETE image containing [`Value::Undefined`].
    pub fn new(
        operation: Operation,
        table: Arc<TableSchema>,
        old_values: Vec<Value>,
        new_values: Vec<Value>,
    ) -> Result<Self, InvariantError> {
        match operation {
            Operation::Insert => {
                expect_empty(operation, Side::Old, &old_values)?;
                expect_image(&table, Side::New, &new_values)?;
                expect_defined(operation, &new_values)?;
            }
            Operation::Delete => {
                expect_empty(operation, Side::New, &new_values)?;
                expect_image(&table, Side::Old, &old_values)?;
                expect_defined(operation, &old_values)?;
            }
            Operation::Update => {
                expect_image(&table, Side::Old, &old_values)?;
                expect_image(&table, Side::New, &new_values)?;
            }
        }
        Ok(Self::from_parts_unchecked(
            operation, table, old_values, new_values,
        ))
    }

    /// Create an INSERT entry.
    ///
    /// # Errors
    ///
    /// See [`ChangesetEntry::new`].
    pub fn insert(table: Arc<TableSchema>, new_values: Vec<Value>) -> Result<Self, InvariantError> {
        Self::new(Operation::Insert, table, Vec::new(), new_values)
    }

    /// Create a DELETE entry.
    ///
    /// # Errors
    ///
    /// See [`ChangesetEntry::new`].
    pub fn delete(table: Arc<TableSchema>, old_values: Vec<Value>) -> Result<Self, InvariantError> {
        Self::new(Operation::Delete, table, old_values, Vec::new())
    }

    /// Create an UPDATE entry.
    ///
    /// # Errors
    ///
    /// See [`ChangesetEntry::new`].
    pub fn update(
        table: Arc<TableSchema>,
        old_values: Vec<Value>,
        new_values: Vec<Value>,
    ) -> Result<Self, InvariantError> {
        Self::new(Operation::Update, table, old_values, new_values)
    }

    /// Used by the reader, which has already validated the record.
    pub(crate) fn from_parts_unchecked(
        operation: Operation,
        table: Arc<TableSchema>,
        old_values: Vec<Value>,
        new_values: Vec<Value>,
    ) -> Self {
        Self {
            operation,
            table,
            indirect: false,
            old_values,
            new_values,
        }
    }

    /// Set SQLite's "indirect" flag, marking a change made by a trigger or
    /// foreign key action rather than directly by the user.
    #[must_use]
    pub fn with_indirect(mut self, indirect: bool) -> Self {
        self.indirect = indirect;
        self
    }

    /// The operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The table this entry belongs to.
    #[must_use]
    pub fn table(&self) -> &Arc<TableSchema> {
        &self.table
    }

    /// Whether the change is flagged as indirect.
    #[must_use]
    pub fn is_indirect(&self) -> bool {
        self.indirect
    }

    /// The pre-image; empty for INSERT.
    #[must_use]
    pub fn old_values(&self) -> &[Value] {
        &self.old_values
    }

    /// The post-image; empty for DELETE.
    #[must_use]
    pub fn new_values(&self) -> &[Value] {
        &self.new_values
    }

    /// Split the entry into operation, table, old values and new values.
    #[must_use]
    pub fn into_parts(self) -> (Operation, Arc<TableSchema>, Vec<Value>, Vec<Value>) {
        (self.operation, self.table, self.old_values, self.new_values)
    }
}

/// Inversion swaps the images wholesale: INSERT becomes DELETE of the same
/// row, DELETE becomes INSERT, and an UPDATE trades its old and new slots,
/// undefined markers included. Table and indirect flag are untouched.
impl Reverse for ChangesetEntry {
    type Output = ChangesetEntry;

    fn reverse(self) -> Self::Output {
        let Self {
            operation,
            table,
            indirect,
            old_values,
            new_values,
        } = self;
        Self {
            operation: operation.reverse(),
            table,
            indirect,
            old_values: new_values,
            new_values: old_values,
        }
    }
}

fn expect_empty(operation: Operation, side: Side, values: &[Value]) -> Result<(), InvariantError> {
    if values.is_empty() {
        Ok(())
    } else {
        Err(InvariantError::UnexpectedValues { operation, side })
    }
}

fn expect_image(table: &TableSchema, side: Side, values: &[Value]) -> Result<(), InvariantError> {
    if values.len() == table.column_count() {
        Ok(())
    } else {
        Err(InvariantError::ColumnCountMismatch {
            table: table.name().to_owned(),
            side,
            expected: table.column_count(),
            found: values.len(),
        })
    }
}

fn expect_defined(operation: Operation, values: &[Value]) -> Result<(), InvariantError> {
    match values.iter().position(Value::is_undefined) {
        Some(column) => Err(InvariantError::UndefinedValue { operation, column }),
        None => Ok(()),
    }
}
