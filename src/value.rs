//! Bound values and the conversions between Rust field types and columns.
//!
//! SQLite has no native boolean or date types, so booleans travel as
//! integers (0/1) and dates as ISO 8601 text.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{OrmError, Result, TypeMismatch};

/// Represents a SQL value that can be bound to a statement or read back
/// from a result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Name of the value's kind, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::String(_) => "text",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "real",
            SqlValue::Bool(_) => "boolean",
            SqlValue::Null => "null",
        }
    }

    fn mismatch(&self, expected: &'static str) -> TypeMismatch {
        TypeMismatch {
            expected,
            found: self.kind().to_string(),
        }
    }
}

/// Semantic type of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    /// Foreign key to the entity stored in the named table.
    Reference(&'static str),
}

impl FieldType {
    /// SQLite column type used in DDL.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text | FieldType::Date => "TEXT",
            FieldType::Integer | FieldType::Boolean | FieldType::Reference(_) => "INTEGER",
            FieldType::Float => "REAL",
        }
    }
}

/// Conversion of a Rust value into a bindable [`SqlValue`].
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;
}

/// A Rust type that can back a persisted field.
///
/// Implementations fix the column's semantic type and nullability and
/// convert stored values back into the field.
pub trait ColumnType: ToSqlValue + Sized {
    const FIELD_TYPE: FieldType;
    const NULLABLE: bool = false;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch>;
}

/// Convert `value` into the type of `field`, attaching the field name to
/// any mismatch.
pub fn decode_field<T: ColumnType>(field: &str, value: SqlValue) -> Result<T> {
    T::from_sql_value(value).map_err(|source| OrmError::Mapping {
        field: field.to_string(),
        source,
    })
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(&self) -> SqlValue {
        self.clone()
    }
}

impl<T: ToSqlValue + ?Sized> ToSqlValue for &T {
    fn to_sql_value(&self) -> SqlValue {
        (**self).to_sql_value()
    }
}

impl ToSqlValue for str {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.to_string())
    }
}

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.clone())
    }
}

impl ColumnType for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::String(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Int(*self)
    }
}

impl ColumnType for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Int(i) => Ok(i),
            SqlValue::Bool(b) => Ok(i64::from(b)),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Int(i64::from(*self))
    }
}

impl ColumnType for i32 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        let wide = i64::from_sql_value(value)?;
        i32::try_from(wide).map_err(|_| TypeMismatch {
            expected: "32-bit integer",
            found: wide.to_string(),
        })
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl ColumnType for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as f64),
            other => Err(other.mismatch("real")),
        }
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl ColumnType for bool {
    const FIELD_TYPE: FieldType = FieldType::Boolean;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            // Any non-zero is true
            SqlValue::Int(i) => Ok(i != 0),
            other => Err(other.mismatch("boolean")),
        }
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.to_rfc3339())
    }
}

impl ColumnType for DateTime<Utc> {
    const FIELD_TYPE: FieldType = FieldType::Date;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        let SqlValue::String(s) = value else {
            return Err(value.mismatch("RFC 3339 timestamp"));
        };
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                // SQLite's datetime() format: "YYYY-MM-DD HH:MM:SS"
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .map_err(|_| TypeMismatch {
                expected: "RFC 3339 timestamp",
                found: s,
            })
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

impl ToSqlValue for NaiveDate {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.format(DATE_FORMAT).to_string())
    }
}

impl ColumnType for NaiveDate {
    const FIELD_TYPE: FieldType = FieldType::Date;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        let SqlValue::String(s) = value else {
            return Err(value.mismatch("date"));
        };
        NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|_| TypeMismatch {
            expected: "date",
            found: s,
        })
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: ColumnType> ColumnType for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_bool_conversion() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert!(bool::from_sql_value(SqlValue::Int(42)).unwrap()); // Any non-zero is true
        assert!(!bool::from_sql_value(SqlValue::Int(0)).unwrap());
    }

    #[test]
    fn test_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        let stored = dt.to_sql_value();
        assert_eq!(DateTime::<Utc>::from_sql_value(stored).unwrap(), dt);
    }

    #[test]
    fn test_sqlite_datetime_format() {
        let parsed =
            DateTime::<Utc>::from_sql_value(SqlValue::String("2024-01-15 10:30:45".into()))
                .unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.month(), 1);
        assert_eq!(parsed.day(), 15);
    }

    #[test]
    fn test_naive_date_text() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 9).unwrap();
        assert_eq!(date.to_sql_value(), SqlValue::String("2021-03-09".into()));
    }

    #[test]
    fn test_option_is_nullable() {
        assert!(<Option<i64> as ColumnType>::NULLABLE);
        assert!(!<i64 as ColumnType>::NULLABLE);
        assert_eq!(<Option<String> as ColumnType>::FIELD_TYPE, FieldType::Text);
        assert_eq!(Option::<i64>::from_sql_value(SqlValue::Null).unwrap(), None);
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
    }

    #[test]
    fn test_mismatch_is_reported_with_field() {
        let err = decode_field::<i64>("age", SqlValue::String("ten".into())).unwrap_err();
        match err {
            OrmError::Mapping { field, source } => {
                assert_eq!(field, "age");
                assert_eq!(source.expected, "integer");
                assert_eq!(source.found, "text");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_i32_out_of_range() {
        assert!(i32::from_sql_value(SqlValue::Int(i64::MAX)).is_err());
        assert_eq!(i32::from_sql_value(SqlValue::Int(7)).unwrap(), 7);
    }
}
