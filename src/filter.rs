//! Column predicates used to build WHERE clauses
//!
//! A [`Filter`] pairs a column with an operator and its operand:
//! - `Eq` compares against a single value (`column = ?`, or `column IS NULL`)
//! - `In` tests membership in a non-empty list (`column in (?, ?, ...)`)
//!
//! Operands are always bound as parameters, never spliced into the SQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::descriptor::{ColumnDescriptor, EntityDescriptor};
use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// Comparison operators understood by the SQL builder.
///
/// Adding a variant means adding its rendering in [`Filter::to_sql`]; the
/// match there is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Eq,
    In,
}

impl Op {
    /// SQL operator keyword
    pub fn to_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::In => "in",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Eq => f.write_str("eq"),
            Op::In => f.write_str("in"),
        }
    }
}

impl FromStr for Op {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" => Ok(Op::Eq),
            "in" => Ok(Op::In),
            _ => Err(OrmError::UnsupportedOperator(s.to_string())),
        }
    }
}

/// Right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Scalar(SqlValue),
    List(Vec<SqlValue>),
}

impl<T: ToSqlValue> From<T> for Operand {
    fn from(value: T) -> Self {
        Operand::Scalar(value.to_sql_value())
    }
}

impl<T: ToSqlValue> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl<T: ToSqlValue, const N: usize> From<[T; N]> for Operand {
    fn from(values: [T; N]) -> Self {
        Operand::List(values.iter().map(ToSqlValue::to_sql_value).collect())
    }
}

/// A single column comparison, optionally bound to one entity's table.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    table: Option<String>,
    column: String,
    condition: Condition,
}

/// Operator and operand after arity checks.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(SqlValue),
    In(Vec<SqlValue>),
}

impl Filter {
    /// Build a filter, checking that the operand fits the operator.
    pub fn new(column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> Result<Self> {
        let column = column.into();
        let condition = match (op, operand.into()) {
            (Op::Eq, Operand::Scalar(value)) => Condition::Eq(value),
            (Op::Eq, Operand::List(_)) => {
                return Err(OrmError::invalid_filter(column, "eq expects a single value"));
            }
            (Op::In, Operand::List(values)) if values.is_empty() => {
                return Err(OrmError::invalid_filter(column, "in expects a non-empty list"));
            }
            (Op::In, Operand::List(values)) => Condition::In(values),
            (Op::In, Operand::Scalar(_)) => {
                return Err(OrmError::invalid_filter(column, "in expects a list of values"));
            }
        };

        Ok(Self {
            table: None,
            column,
            condition,
        })
    }

    /// Build a filter that only applies to `E`'s table.
    pub fn for_entity<E: Entity>(
        column: impl Into<String>,
        op: Op,
        operand: impl Into<Operand>,
    ) -> Result<Self> {
        Ok(Self::new(column, op, operand)?.on_table(E::TABLE_NAME))
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl ToSqlValue) -> Self {
        Self {
            table: None,
            column: column.into(),
            condition: Condition::Eq(value.to_sql_value()),
        }
    }

    /// `column in (values...)`; fails on an empty list.
    pub fn is_in<T: ToSqlValue>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        let values: Vec<SqlValue> = values.into_iter().map(|v| v.to_sql_value()).collect();
        Self::new(column, Op::In, Operand::List(values))
    }

    /// Parse `{"column": "name", "op": "in", "value": ["a", "b"]}`.
    ///
    /// An optional `"table"` key restricts the filter to that table.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let column = json
            .get("column")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| OrmError::invalid_filter("", "missing 'column'"))?;
        let op: Op = json
            .get("op")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| OrmError::invalid_filter(column, "missing 'op'"))?
            .parse()?;

        let operand = match json.get("value") {
            Some(JsonValue::Array(items)) => Operand::List(
                items
                    .iter()
                    .map(|item| json_scalar(column, item))
                    .collect::<Result<_>>()?,
            ),
            Some(item) => Operand::Scalar(json_scalar(column, item)?),
            None => return Err(OrmError::invalid_filter(column, "missing 'value'")),
        };

        let filter = Self::new(column, op, operand)?;
        Ok(match json.get("table").and_then(JsonValue::as_str) {
            Some(table) => filter.on_table(table),
            None => filter,
        })
    }

    fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn op(&self) -> Op {
        match self.condition {
            Condition::Eq(_) => Op::Eq,
            Condition::In(_) => Op::In,
        }
    }

    /// Operand values in bind order.
    pub fn values(&self) -> &[SqlValue] {
        match &self.condition {
            Condition::Eq(value) => std::slice::from_ref(value),
            Condition::In(values) => values,
        }
    }

    /// Table this filter is restricted to, if any.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Find the column this filter targets on `descriptor`.
    ///
    /// The name is matched against column names first, then field names,
    /// so a filter on a reference field (`user`) targets its key column
    /// (`user_id`).
    pub fn resolve<'d>(&self, descriptor: &'d EntityDescriptor) -> Result<&'d ColumnDescriptor> {
        if let Some(table) = self.table() {
            if table != descriptor.table() {
                return Err(OrmError::invalid_filter(
                    &self.column,
                    format!("filter targets '{table}', not '{}'", descriptor.table()),
                ));
            }
        }

        descriptor
            .column(&self.column)
            .or_else(|| descriptor.column_for_field(&self.column))
            .ok_or_else(|| {
                OrmError::invalid_filter(
                    &self.column,
                    format!("no such column on '{}'", descriptor.table()),
                )
            })
    }

    /// Render this filter against `column` as a WHERE fragment and the
    /// values it binds.
    pub fn to_sql(&self, column: &ColumnDescriptor) -> (String, Vec<SqlValue>) {
        let op = self.op().to_sql();
        match &self.condition {
            Condition::Eq(SqlValue::Null) => (format!("{} IS NULL", column.name), Vec::new()),
            Condition::Eq(value) => (format!("{} {op} ?", column.name), vec![value.clone()]),
            Condition::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                (
                    format!("{} {op} ({placeholders})", column.name),
                    values.clone(),
                )
            }
        }
    }
}

fn json_scalar(column: &str, value: &JsonValue) -> Result<SqlValue> {
    match value {
        JsonValue::Null => Ok(SqlValue::Null),
        JsonValue::Bool(b) => Ok(SqlValue::Bool(*b)),
        JsonValue::String(s) => Ok(SqlValue::String(s.clone())),
        JsonValue::Number(n) => n
            .as_i64()
            .map(SqlValue::Int)
            .or_else(|| n.as_f64().map(SqlValue::Float))
            .ok_or_else(|| OrmError::invalid_filter(column, format!("unsupported number {n}"))),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(OrmError::invalid_filter(
            column,
            "operand values must be scalars",
        )),
    }
}
