//! Shared entities and helpers for the integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tracing_subscriber::EnvFilter;
use unikorm::{Composite, Database, Entity, SqliteConnection};

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Message {
    pub id: Option<i64>,
    #[orm(references)]
    pub user: User,
    pub message: String,
    pub date: DateTime<Utc>,
}

impl Message {
    pub fn new(user: &User, message: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user: user.clone(),
            message: message.into(),
            date,
        }
    }
}

/// Read-only view over the `message` table.
#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "message")]
pub struct MessageModel {
    pub id: Option<i64>,
    pub user_id: i64,
    pub message: String,
}

#[derive(Debug, Default, Composite)]
pub struct MessageListModel {
    pub user_id: i64,
    #[orm(has_many = "user_id")]
    pub messages: Vec<Message>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh in-memory database.
pub fn database() -> Database<SqliteConnection> {
    init_tracing();
    Database::new(SqliteConnection::open_in_memory().expect("open in-memory database"))
}

/// A database with the `user` and `message` tables created.
pub fn database_with_tables() -> Database<SqliteConnection> {
    let db = database();
    db.create_table::<User>().expect("create user table");
    db.create_table::<Message>().expect("create message table");
    db
}

pub fn fixed_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 4, 1, 12, 30, 0).unwrap()
}
