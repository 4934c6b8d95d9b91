//! SQL statement builder
//!
//! Pure functions turning an [`EntityDescriptor`] (plus an instance or a
//! filter list) into SQL with positional `?` placeholders and the values to
//! bind, in placeholder order.

use crate::descriptor::EntityDescriptor;
use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::filter::Filter;
use crate::value::SqlValue;

/// A rendered statement and its bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }
}

/// Generate CREATE TABLE SQL.
///
/// Reference columns are plain integers: foreign keys are resolved by the
/// relation loader, not enforced by the database.
pub fn create_table_sql(descriptor: &EntityDescriptor) -> String {
    render_create_table(descriptor, false)
}

/// Generate CREATE TABLE IF NOT EXISTS SQL
pub fn create_table_if_not_exists_sql(descriptor: &EntityDescriptor) -> String {
    render_create_table(descriptor, true)
}

fn render_create_table(descriptor: &EntityDescriptor, if_not_exists: bool) -> String {
    let column_defs: Vec<String> = descriptor.columns().iter().map(|c| c.to_sql()).collect();

    format!(
        "CREATE TABLE {}{} (\n  {}\n)",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        descriptor.table(),
        column_defs.join(",\n  ")
    )
}

pub fn drop_table_sql(descriptor: &EntityDescriptor) -> String {
    format!("DROP TABLE {}", descriptor.table())
}

pub fn drop_table_if_exists_sql(descriptor: &EntityDescriptor) -> String {
    format!("DROP TABLE IF EXISTS {}", descriptor.table())
}

/// INSERT of every column except the database-generated primary key.
pub fn insert_sql<E: Entity>(descriptor: &EntityDescriptor, instance: &E) -> Result<Statement> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for column in descriptor.data_columns() {
        columns.push(column.name.as_str());
        values.push(read_field(descriptor, instance, column.field)?);
    }

    if columns.is_empty() {
        return Ok(Statement::new(format!(
            "INSERT INTO {} DEFAULT VALUES",
            descriptor.table()
        )));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        descriptor.table(),
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );
    Ok(Statement { sql, values })
}

/// UPDATE of every non-key column, matched on the instance's primary key.
pub fn update_sql<E: Entity>(descriptor: &EntityDescriptor, instance: &E) -> Result<Statement> {
    let key = descriptor.primary_key();
    let id = match read_field(descriptor, instance, key.field)? {
        SqlValue::Null => {
            return Err(OrmError::MissingIdentity {
                table: descriptor.table().to_string(),
            });
        }
        id => id,
    };

    let mut assignments = Vec::new();
    let mut values = Vec::new();
    for column in descriptor.data_columns() {
        assignments.push(format!("{} = ?", column.name));
        values.push(read_field(descriptor, instance, column.field)?);
    }
    if assignments.is_empty() {
        assignments.push(format!("{0} = {0}", key.name));
    }
    values.push(id);

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        descriptor.table(),
        assignments.join(", "),
        key.name
    );
    Ok(Statement { sql, values })
}

/// SELECT of every column, filters ANDed in the order given.
pub fn select_sql(descriptor: &EntityDescriptor, filters: &[Filter]) -> Result<Statement> {
    let columns: Vec<&str> = descriptor.columns().iter().map(|c| c.name.as_str()).collect();
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), descriptor.table());
    let mut values = Vec::new();

    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        let column = filter.resolve(descriptor)?;
        let (condition, bound) = filter.to_sql(column);
        conditions.push(condition);
        values.extend(bound);
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    Ok(Statement { sql, values })
}

fn read_field<E: Entity>(descriptor: &EntityDescriptor, instance: &E, field: &str) -> Result<SqlValue> {
    instance.get(field).ok_or_else(|| OrmError::UnknownField {
        entity: descriptor.type_name(),
        field: field.to_string(),
    })
}
