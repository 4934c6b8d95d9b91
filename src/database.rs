//! Database facade
//!
//! Stateless operation surface over an injected [`Connection`]. Every call
//! is a single autocommit statement (plus the secondary queries of relation
//! loading); nothing is retried.
//!
//! ```rust,ignore
//! let db = Database::new(SqliteConnection::open_in_memory()?);
//! db.create_table::<User>()?;
//!
//! let mut user = User::new("John Snow");
//! db.insert(&mut user)?;
//!
//! let found: Vec<User> = db.find(&[Filter::eq("name", "John Snow")])?;
//! ```

use std::sync::Arc;

use tracing::info;

use crate::builder::{self, Statement};
use crate::connection::{Connection, ExecResult, Row};
use crate::descriptor::{DescriptorRegistry, EntityDescriptor};
use crate::entity::{Entity, Fetchable, PRIMARY_KEY};
use crate::error::{OrmError, Result};
use crate::filter::Filter;
use crate::value::SqlValue;

/// CRUD operations for entity types over one connection.
pub struct Database<C: Connection> {
    conn: C,
    registry: Arc<DescriptorRegistry>,
}

impl<C: Connection> Database<C> {
    /// Facade using the process-wide descriptor registry.
    pub fn new(conn: C) -> Self {
        Self::with_registry(conn, DescriptorRegistry::global())
    }

    pub fn with_registry(conn: C, registry: Arc<DescriptorRegistry>) -> Self {
        Self { conn, registry }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn registry(&self) -> &Arc<DescriptorRegistry> {
        &self.registry
    }

    /// Table mapping for `E`.
    pub fn describe<E: Entity>(&self) -> Result<Arc<EntityDescriptor>> {
        self.registry.describe::<E>()
    }

    /// Create `E`'s table. Fails if the table already exists.
    pub fn create_table<E: Entity>(&self) -> Result<()> {
        let descriptor = self.describe::<E>()?;
        self.conn.execute(&builder::create_table_sql(&descriptor), &[])?;
        info!(table = descriptor.table(), "Created table");
        Ok(())
    }

    /// Create `E`'s table unless it already exists.
    pub fn create_table_if_not_exists<E: Entity>(&self) -> Result<()> {
        let descriptor = self.describe::<E>()?;
        self.conn
            .execute(&builder::create_table_if_not_exists_sql(&descriptor), &[])?;
        Ok(())
    }

    /// Drop `E`'s table. Fails if the table does not exist.
    pub fn drop_table<E: Entity>(&self) -> Result<()> {
        let descriptor = self.describe::<E>()?;
        self.conn.execute(&builder::drop_table_sql(&descriptor), &[])?;
        info!(table = descriptor.table(), "Dropped table");
        Ok(())
    }

    pub fn drop_table_if_exists<E: Entity>(&self) -> Result<()> {
        let descriptor = self.describe::<E>()?;
        self.conn
            .execute(&builder::drop_table_if_exists_sql(&descriptor), &[])?;
        Ok(())
    }

    /// Insert `instance` and write the generated primary key back into it.
    ///
    /// The INSERT runs as its own autocommit statement. If the connection
    /// then reports no generated id (`IdentityUnavailable`) or the id does
    /// not fit the key field (`Mapping`, e.g. an `Option<i32>` key past
    /// `i32::MAX`), the row stays persisted while `instance` keeps its
    /// unset key.
    pub fn insert<E: Entity>(&self, instance: &mut E) -> Result<i64> {
        let descriptor = self.describe::<E>()?;
        let statement = builder::insert_sql(&descriptor, instance)?;
        let result = self.run(&statement)?;

        let id = result
            .last_insert_id
            .ok_or_else(|| OrmError::IdentityUnavailable {
                table: descriptor.table().to_string(),
            })?;
        instance.set(descriptor.primary_key().field, SqlValue::Int(id))?;
        Ok(id)
    }

    /// Write every non-key column of `instance` to its row.
    ///
    /// Returns the number of rows changed (zero or one).
    pub fn update<E: Entity>(&self, instance: &E) -> Result<u64> {
        let descriptor = self.describe::<E>()?;
        let statement = builder::update_sql(&descriptor, instance)?;
        Ok(self.run(&statement)?.rows_affected)
    }

    /// Every row of `E` matching all `filters`, with relations resolved.
    ///
    /// An empty filter list selects the whole table.
    pub fn find<E: Entity>(&self, filters: &[Filter]) -> Result<Vec<E>> {
        let mut found = self.load::<E>(filters)?;
        for instance in &mut found {
            instance.resolve_relations(self)?;
        }
        Ok(found)
    }

    pub fn find_all<E: Entity>(&self) -> Result<Vec<E>> {
        self.find(&[])
    }

    pub fn find_by_id<E: Entity>(&self, id: i64) -> Result<Option<E>> {
        Ok(self
            .find::<E>(&[Filter::eq(PRIMARY_KEY, id)])?
            .into_iter()
            .next())
    }

    /// Load `target` in place: entities by primary key, composites through
    /// their child lists.
    pub fn fetch<T: Fetchable>(&self, target: &mut T) -> Result<()> {
        target.fetch_from(self)
    }

    /// Reload every column of `instance` from the row matching its primary
    /// key, then resolve its relations.
    pub fn fetch_entity<E: Entity>(&self, instance: &mut E) -> Result<()> {
        let descriptor = self.describe::<E>()?;
        let id = instance.identity().ok_or_else(|| OrmError::MissingIdentity {
            table: descriptor.table().to_string(),
        })?;

        let statement =
            builder::select_sql(&descriptor, &[Filter::eq(&descriptor.primary_key().name, id)])?;
        let row = self
            .conn
            .query(&statement.sql, &statement.values)?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::NotFound {
                table: descriptor.table().to_string(),
                id,
            })?;

        assign_row(&descriptor, instance, row)?;
        instance.resolve_relations(self)
    }

    /// Rows of `E` matching `filters`, without relation resolution.
    pub(crate) fn load<E: Entity>(&self, filters: &[Filter]) -> Result<Vec<E>> {
        let descriptor = self.describe::<E>()?;
        let statement = builder::select_sql(&descriptor, filters)?;
        let rows = self.conn.query(&statement.sql, &statement.values)?;

        rows.into_iter()
            .map(|row| {
                let mut instance = E::default();
                assign_row(&descriptor, &mut instance, row)?;
                Ok(instance)
            })
            .collect()
    }

    fn run(&self, statement: &Statement) -> Result<ExecResult> {
        self.conn.execute(&statement.sql, &statement.values)
    }
}

/// Copy each column of `row` into its field on `instance`.
fn assign_row<E: Entity>(descriptor: &EntityDescriptor, instance: &mut E, mut row: Row) -> Result<()> {
    for column in descriptor.columns() {
        let value = row.take(&column.name).ok_or_else(|| {
            OrmError::schema(
                descriptor.type_name(),
                format!("result row has no column '{}'", column.name),
            )
        })?;
        instance.set(column.field, value)?;
    }
    Ok(())
}
