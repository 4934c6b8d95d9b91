//! The connection contract the facade executes statements through.
//!
//! Implementations own the driver, its thread-safety and any timeouts; the
//! facade only hands them SQL text and bound values.

use crate::error::Result;
use crate::value::SqlValue;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Identity generated by an INSERT, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// One result row: column names paired with their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push((column.into(), value));
    }

    /// Value of `column`, or `None` if the row has no such column.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Move the value of `column` out of the row.
    pub fn take(&mut self, column: &str) -> Option<SqlValue> {
        self.columns
            .iter_mut()
            .find(|(name, _)| name == column)
            .map(|(_, value)| std::mem::replace(value, SqlValue::Null))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, SqlValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(c, v)| (c.into(), v)).collect(),
        }
    }
}

/// A blocking handle able to run parameterized SQL.
///
/// Failures are reported as [`crate::OrmError::Execution`].
pub trait Connection: Send + Sync {
    /// Run a statement that returns no rows (DDL, INSERT, UPDATE).
    fn execute(&self, sql: &str, values: &[SqlValue]) -> Result<ExecResult>;

    /// Run a query and materialize every row.
    fn query(&self, sql: &str, values: &[SqlValue]) -> Result<Vec<Row>>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, sql: &str, values: &[SqlValue]) -> Result<ExecResult> {
        (**self).execute(sql, values)
    }

    fn query(&self, sql: &str, values: &[SqlValue]) -> Result<Vec<Row>> {
        (**self).query(sql, values)
    }
}
