//! Core traits for mapped types
//!
//! These traits are implemented by the `#[derive(Entity)]` and
//! `#[derive(Composite)]` macros from `unikorm-macros`.

use crate::connection::Connection;
use crate::database::Database;
use crate::error::Result;
use crate::value::{FieldType, SqlValue};

/// Name of the primary-key field every entity must declare.
pub const PRIMARY_KEY: &str = "id";

/// Field metadata emitted by the derive, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name on the Rust type
    pub name: &'static str,
    /// Semantic type of the stored value
    pub field_type: FieldType,
    /// Whether the column can be NULL
    pub nullable: bool,
}

/// A data-holder type mapped to exactly one table.
///
/// Field access is keyed by field name. For a reference field, `get`
/// yields the referenced entity's primary key and `set` replaces the field
/// with a stub carrying only that key.
pub trait Entity: Default + Send + Sync + 'static {
    /// The SQL table name (e.g., "user")
    const TABLE_NAME: &'static str;

    /// Persistable fields in declaration order.
    fn fields() -> &'static [FieldDef];

    /// Current value of `field`, or `None` if the entity has no such field.
    fn get(&self, field: &str) -> Option<SqlValue>;

    /// Assign a stored value to `field`.
    fn set(&mut self, field: &str, value: SqlValue) -> Result<()>;

    /// Populate reference fields from their foreign keys (one hop).
    fn resolve_relations<C: Connection>(&mut self, _db: &Database<C>) -> Result<()> {
        Ok(())
    }

    /// The primary-key value, if set.
    fn identity(&self) -> Option<i64> {
        match self.get(PRIMARY_KEY) {
            Some(SqlValue::Int(id)) => Some(id),
            _ => None,
        }
    }
}

/// Anything [`Database::fetch`] can load in place.
pub trait Fetchable {
    fn fetch_from<C: Connection>(&mut self, db: &Database<C>) -> Result<()>;
}
