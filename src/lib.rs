//! # unikorm
//!
//! A minimal object-relational mapping layer:
//! - `#[derive(Entity)]` binds a plain struct to a table
//! - [`EntityDescriptor`]s derive table and column definitions, cached per type
//! - [`Filter`] is a small operator + operand DSL for WHERE clauses
//! - [`builder`] renders parameterized DDL and CRUD SQL
//! - [`Database`] runs it all through an injected [`Connection`]
//!
//! ```rust,ignore
//! use unikorm::{Database, Entity, Filter, Op, SqliteConnection};
//!
//! #[derive(Debug, Default, Entity)]
//! pub struct User {
//!     pub id: Option<i64>,
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Default, Entity)]
//! pub struct Message {
//!     pub id: Option<i64>,
//!     #[orm(references)]
//!     pub user: User, // stored as `user_id`
//!     pub message: String,
//! }
//!
//! let db = Database::new(SqliteConnection::open_in_memory()?);
//! db.create_table::<User>()?;
//! db.create_table::<Message>()?;
//!
//! let mut user = User { name: "John Snow".into(), ..Default::default() };
//! db.insert(&mut user)?;
//!
//! let users: Vec<User> = db.find(&[Filter::new("name", Op::In, ["Pierre", "Paul"])?])?;
//! ```
//!
//! ## Entity Attributes
//!
//! - `#[orm(table = "...")]` on the struct - table name (default: the type
//!   name lower-cased)
//! - `#[orm(references)]` - field holds another entity, stored as
//!   `<table>_id`
//! - `#[orm(skip)]` - field is not persisted
//!
//! An entity-typed field without `#[orm(references)]` is not a column type
//! and is rejected at compile time:
//!
//! ```rust,compile_fail
//! use unikorm::Entity;
//!
//! #[derive(Default, Entity)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! #[derive(Default, Entity)]
//! struct Message {
//!     id: Option<i64>,
//!     user: User, // missing #[orm(references)]
//! }
//! ```
//!
//! `#[derive(Composite)]` builds list holders filled by [`Database::fetch`]:
//! `#[orm(has_many = "user_id")] messages: Vec<Message>` loads every message
//! whose `user_id` equals the holder's `user_id` field.

pub mod builder;
pub mod config;
mod connection;
mod database;
pub mod descriptor;
mod entity;
mod error;
mod filter;
pub mod relation;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod value;

pub use builder::Statement;
pub use config::OrmConfig;
pub use connection::{Connection, ExecResult, Row};
pub use database::Database;
pub use descriptor::{
    ColumnDescriptor, DescriptorRegistry, EntityDescriptor, Relation, describe,
};
pub use entity::{Entity, FieldDef, Fetchable, PRIMARY_KEY};
pub use error::{OrmError, Result, TypeMismatch};
pub use filter::{Filter, Op, Operand};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;
pub use value::{ColumnType, FieldType, SqlValue, ToSqlValue};

pub use unikorm_macros::{Composite, Entity};
