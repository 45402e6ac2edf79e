//! Conversions between [`Value`] and rusqlite's value types.

use quarry_core::Value;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// Borrowed parameter adapter for binding a [`Value`].
#[derive(Debug, Clone, Copy)]
pub struct SqliteParam<'a>(pub &'a Value);

impl ToSql for SqliteParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
            Value::Integer(i) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i))),
            Value::Real(f) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Real(*f))),
            Value::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Value::Blob(b) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(b))),
            // Lists are expanded into one placeholder per element when a
            // statement is rendered.
            Value::List(_) => Err(rusqlite::Error::ToSqlConversionFailure(
                "list parameters must be expanded before binding".into(),
            )),
        }
    }
}

/// Owned column value read from a row.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteValue(pub Value);

impl FromSql for SqliteValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let value = match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(items) => match std::str::from_utf8(items) {
                Ok(s) => Value::Text(s.to_owned()),
                Err(err) => return Err(FromSqlError::Other(Box::new(err))),
            },
            ValueRef::Blob(items) => Value::Blob(items.to_vec()),
        };
        Ok(SqliteValue(value))
    }
}

impl From<SqliteValue> for Value {
    fn from(value: SqliteValue) -> Self {
        value.0
    }
}

impl From<rusqlite::types::Value> for SqliteValue {
    fn from(value: rusqlite::types::Value) -> Self {
        SqliteValue(match value {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(i) => Value::Integer(i),
            rusqlite::types::Value::Real(r) => Value::Real(r),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => Value::Blob(b),
        })
    }
}
