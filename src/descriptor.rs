//! Table and column metadata derived from entity types
//!
//! A descriptor is built the first time an entity type is used and cached
//! in a [`DescriptorRegistry`] for the life of the registry. Descriptors are
//! immutable once published.

use std::any::{TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::entity::{Entity, PRIMARY_KEY};
use crate::error::{OrmError, Result};
use crate::value::FieldType;

/// Column definition for one persisted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name in the database
    pub name: String,
    /// Field on the entity the column is read from and written to
    pub field: &'static str,
    /// Semantic type of the column
    pub field_type: FieldType,
    /// Whether the column can be NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub is_primary_key: bool,
}

impl ColumnDescriptor {
    /// Generate the column definition SQL
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.field_type.sql_type());

        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT NOT NULL");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }

        sql
    }
}

/// A foreign-key link from one of the entity's columns to another table's
/// primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub column: String,
    pub target_table: &'static str,
}

/// Table mapping for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: &'static str,
    table: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: usize,
    relations: Vec<Relation>,
}

impl EntityDescriptor {
    /// Derive the mapping for `E` from its declared fields.
    pub fn build<E: Entity>() -> Result<Self> {
        let entity = type_name::<E>();
        let table = E::TABLE_NAME.trim();
        if table.is_empty() {
            return Err(OrmError::schema(entity, "table name is empty"));
        }

        let fields = E::fields();
        if fields.is_empty() {
            return Err(OrmError::schema(entity, "no persistable fields"));
        }

        let mut columns = Vec::with_capacity(fields.len());
        let mut relations = Vec::new();
        let mut seen = HashSet::new();

        for field in fields {
            let name = match field.field_type {
                FieldType::Reference(target) => {
                    let column = format!("{target}_id");
                    relations.push(Relation {
                        field: field.name,
                        column: column.clone(),
                        target_table: target,
                    });
                    column
                }
                _ => field.name.to_string(),
            };

            if !seen.insert(name.clone()) {
                return Err(OrmError::schema(
                    entity,
                    format!("column '{name}' is declared twice"),
                ));
            }

            columns.push(ColumnDescriptor {
                is_primary_key: name == PRIMARY_KEY,
                name,
                field: field.name,
                field_type: field.field_type,
                nullable: field.nullable,
            });
        }

        let primary_key = columns
            .iter()
            .position(|c| c.is_primary_key)
            .ok_or_else(|| OrmError::schema(entity, "missing primary key field 'id'"))?;

        if columns[primary_key].field_type != FieldType::Integer {
            return Err(OrmError::schema(entity, "primary key 'id' must be an integer"));
        }
        // an unset key must be representable before insert
        if !columns[primary_key].nullable {
            return Err(OrmError::schema(entity, "primary key 'id' must be optional"));
        }

        Ok(Self {
            type_name: entity,
            table: table.to_string(),
            columns,
            primary_key,
            relations,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[self.primary_key]
    }

    /// Every column except the primary key, in declaration order.
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_primary_key)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_for_field(&self, field: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

static GLOBAL: Lazy<Arc<DescriptorRegistry>> = Lazy::new(|| Arc::new(DescriptorRegistry::new()));

/// Cache of descriptors keyed by entity type.
///
/// Lookups are read-through: a missing descriptor is built outside the lock
/// and the first one published wins, so concurrent first use converges on a
/// single shared instance.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    cache: RwLock<HashMap<TypeId, Arc<EntityDescriptor>>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first access.
    pub fn global() -> Arc<DescriptorRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Descriptor for `E`, building and caching it on first use.
    pub fn describe<E: Entity>(&self) -> Result<Arc<EntityDescriptor>> {
        let key = TypeId::of::<E>();
        if let Some(descriptor) = self.cache.read().get(&key) {
            return Ok(Arc::clone(descriptor));
        }

        let built = Arc::new(EntityDescriptor::build::<E>()?);
        let mut cache = self.cache.write();
        let descriptor = cache.entry(key).or_insert_with(|| {
            tracing::debug!(entity = built.type_name(), table = built.table(), "Registered entity");
            Arc::clone(&built)
        });
        Ok(Arc::clone(descriptor))
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Drop every cached descriptor. Descriptors already handed out stay
    /// valid; the next lookup rebuilds.
    pub fn reset(&self) {
        self.cache.write().clear();
    }
}

/// Descriptor for `E` from the process-wide registry.
pub fn describe<E: Entity>() -> Result<Arc<EntityDescriptor>> {
    GLOBAL.describe::<E>()
}
