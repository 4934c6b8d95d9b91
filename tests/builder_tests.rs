//! SQL rendering from derived descriptors

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use unikorm::builder::{
    create_table_if_not_exists_sql, create_table_sql, drop_table_sql, insert_sql, select_sql,
    update_sql,
};
use unikorm::{describe, Entity, FieldType, Filter, Op, OrmError, SqlValue};

use common::{fixed_date, Message, MessageModel, User};

#[derive(Debug, Default, Entity)]
struct Marker {
    id: Option<i64>,
}

#[derive(Debug, Default, Entity)]
struct Profile {
    id: Option<i64>,
    score: f64,
    active: bool,
    born: Option<NaiveDate>,
    #[orm(skip)]
    cached_rank: u32,
}

#[derive(Debug, Default, Entity)]
struct PlainKey {
    id: i64,
    name: String,
}

#[derive(Debug, Default, Entity)]
struct BlogPost {
    id: Option<i64>,
    r#type: String,
}

#[test]
fn test_create_table_sql() {
    let sql = create_table_sql(&describe::<User>().unwrap());
    assert_eq!(
        sql,
        "CREATE TABLE user (\n  id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\n  name TEXT NOT NULL\n)"
    );
}

#[test]
fn test_create_table_sql_with_reference() {
    let sql = create_table_sql(&describe::<Message>().unwrap());
    assert_eq!(
        sql,
        "CREATE TABLE message (\n  \
         id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\n  \
         user_id INTEGER NOT NULL,\n  \
         message TEXT NOT NULL,\n  \
         date TEXT NOT NULL\n)"
    );
}

#[test]
fn test_create_table_sql_is_deterministic() {
    let first = create_table_sql(&describe::<Message>().unwrap());
    let second = create_table_sql(&describe::<Message>().unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_column_types_and_skipped_fields() {
    let descriptor = describe::<Profile>().unwrap();
    assert_eq!(
        create_table_if_not_exists_sql(&descriptor),
        "CREATE TABLE IF NOT EXISTS profile (\n  \
         id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\n  \
         score REAL NOT NULL,\n  \
         active INTEGER NOT NULL,\n  \
         born TEXT\n)"
    );
    assert!(descriptor.column("cached_rank").is_none());
    assert_eq!(descriptor.column("born").unwrap().field_type, FieldType::Date);
}

#[test]
fn test_table_names() {
    assert_eq!(User::TABLE_NAME, "user");
    assert_eq!(BlogPost::TABLE_NAME, "blogpost");
    assert_eq!(MessageModel::TABLE_NAME, "message");
    assert_eq!(drop_table_sql(&describe::<BlogPost>().unwrap()), "DROP TABLE blogpost");
}

#[test]
fn test_raw_identifier_field() {
    let descriptor = describe::<BlogPost>().unwrap();
    assert!(descriptor.column("type").is_some());

    let post = BlogPost {
        id: None,
        r#type: "draft".into(),
    };
    let statement = insert_sql(&descriptor, &post).unwrap();
    assert_eq!(statement.sql, "INSERT INTO blogpost (type) VALUES (?)");
}

#[test]
fn test_reference_relation() {
    let descriptor = describe::<Message>().unwrap();
    let relations = descriptor.relations();
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].field, "user");
    assert_eq!(relations[0].column, "user_id");
    assert_eq!(relations[0].target_table, "user");
}

#[test]
fn test_insert_sql() {
    let user = User::new("John Snow");
    let statement = insert_sql(&describe::<User>().unwrap(), &user).unwrap();
    assert_eq!(statement.sql, "INSERT INTO user (name) VALUES (?)");
    assert_eq!(statement.values, [SqlValue::String("John Snow".into())]);
}

#[test]
fn test_insert_sql_writes_reference_key() {
    let user = User {
        id: Some(3),
        name: "John Snow".into(),
    };
    let message = Message::new(&user, "Hello", fixed_date());
    let statement = insert_sql(&describe::<Message>().unwrap(), &message).unwrap();
    assert_eq!(
        statement.sql,
        "INSERT INTO message (user_id, message, date) VALUES (?, ?, ?)"
    );
    assert_eq!(
        statement.values,
        [
            SqlValue::Int(3),
            SqlValue::String("Hello".into()),
            SqlValue::String(fixed_date().to_rfc3339()),
        ]
    );
}

#[test]
fn test_insert_sql_without_data_columns() {
    let statement = insert_sql(&describe::<Marker>().unwrap(), &Marker::default()).unwrap();
    assert_eq!(statement.sql, "INSERT INTO marker DEFAULT VALUES");
    assert!(statement.values.is_empty());
}

#[test]
fn test_update_sql() {
    let user = User {
        id: Some(1),
        name: "It's me".into(),
    };
    let statement = update_sql(&describe::<User>().unwrap(), &user).unwrap();
    assert_eq!(statement.sql, "UPDATE user SET name = ? WHERE id = ?");
    assert_eq!(
        statement.values,
        [SqlValue::String("It's me".into()), SqlValue::Int(1)]
    );
}

#[test]
fn test_update_sql_requires_identity() {
    let result = update_sql(&describe::<User>().unwrap(), &User::new("John Snow"));
    assert_matches!(result, Err(OrmError::MissingIdentity { table }) if table == "user");
}

#[test]
fn test_update_sql_without_data_columns() {
    let marker = Marker { id: Some(4) };
    let statement = update_sql(&describe::<Marker>().unwrap(), &marker).unwrap();
    assert_eq!(statement.sql, "UPDATE marker SET id = id WHERE id = ?");
    assert_eq!(statement.values, [SqlValue::Int(4)]);
}

#[test]
fn test_select_sql_without_filters() {
    let statement = select_sql(&describe::<User>().unwrap(), &[]).unwrap();
    assert_eq!(statement.sql, "SELECT id, name FROM user");
    assert!(statement.values.is_empty());
}

#[test]
fn test_select_sql_with_filters() {
    let filters = [
        Filter::new("name", Op::In, ["Pierre", "Paul"]).unwrap(),
        Filter::eq("id", 2),
    ];
    let statement = select_sql(&describe::<User>().unwrap(), &filters).unwrap();
    assert_eq!(
        statement.sql,
        "SELECT id, name FROM user WHERE name in (?, ?) AND id = ?"
    );
    assert_eq!(
        statement.values,
        [
            SqlValue::String("Pierre".into()),
            SqlValue::String("Paul".into()),
            SqlValue::Int(2),
        ]
    );
}

#[test]
fn test_select_sql_reference_field_targets_key_column() {
    let statement =
        select_sql(&describe::<Message>().unwrap(), &[Filter::eq("user", 1)]).unwrap();
    assert_eq!(
        statement.sql,
        "SELECT id, user_id, message, date FROM message WHERE user_id = ?"
    );
}

#[test]
fn test_select_sql_rejects_unknown_column() {
    let result = select_sql(&describe::<User>().unwrap(), &[Filter::eq("age", 3)]);
    assert_matches!(result, Err(OrmError::InvalidFilter { column, .. }) if column == "age");
}

#[test]
fn test_select_sql_rejects_filter_for_other_table() {
    let filter = Filter::for_entity::<User>("id", Op::Eq, 1).unwrap();
    assert_matches!(
        select_sql(&describe::<Message>().unwrap(), &[filter.clone()]),
        Err(OrmError::InvalidFilter { .. })
    );
    assert!(select_sql(&describe::<User>().unwrap(), &[filter]).is_ok());
}

#[test]
fn test_projection_shares_table_with_entity() {
    let model = describe::<MessageModel>().unwrap();
    let message = describe::<Message>().unwrap();
    assert_eq!(model.table(), message.table());
    assert_eq!(
        select_sql(&model, &[]).unwrap().sql,
        "SELECT id, user_id, message FROM message"
    );
}

#[test]
fn test_required_primary_key_cannot_be_described() {
    assert_matches!(
        describe::<PlainKey>(),
        Err(OrmError::Schema { reason, .. }) if reason.contains("optional")
    );
}
