//! Dynamic values bound as parameters and read back from rows.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{QuarryError, Result};

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub enum Value {
    #[default]
    Null,
    /// Integer value (i64)
    Integer(i64),
    /// Real value (f64)
    Real(f64),
    /// Text value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Parameter list, expanded to `?, ?, ...` when bound to a raw fragment
    List(Vec<Value>),
}

/// Hashable projection of a [`Value`] used to match keys across rows.
///
/// Reals and lists never act as keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Integer(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the key form of this value, `None` for NULL, reals and lists.
    pub fn key(&self) -> Option<Key> {
        match self {
            Value::Integer(i) => Some(Key::Integer(*i)),
            Value::Text(s) => Some(Key::Text(s.clone())),
            Value::Blob(b) => Some(Key::Blob(b.clone())),
            Value::Null | Value::Real(_) | Value::List(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
            Value::List(_) => "LIST",
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Integer(i) => Value::Integer(i),
            Key::Text(s) => Value::Text(s),
            Key::Blob(b) => Value::Blob(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

//------------------------------------------------------------------------------
// Conversions into Value
//------------------------------------------------------------------------------

macro_rules! impl_from_integer {
    ($($ty:ty),*) => { $(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Integer(value as i64)
            }
        }
    )* }
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(values: [T; N]) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

/// Text layout of stored timestamps. Fixed width, so text comparison orders
/// them chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Layouts accepted when reading a timestamp back.
const TIMESTAMP_INPUTS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Text(value.format(TIMESTAMP_FORMAT).to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::from(value.naive_utc())
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Real(r) => serde_json::Number::from_f64(r)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Blob(b) => serde_json::Value::Array(b.into_iter().map(Into::into).collect()),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
        }
    }
}

//------------------------------------------------------------------------------
// Conversions out of Value
//------------------------------------------------------------------------------

/// Reads a Rust scalar out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(QuarryError::Mapping(format!(
        "expected {}, found {}",
        expected,
        value.kind()
    )))
}

macro_rules! impl_from_value_integer {
    ($($ty:ty),*) => { $(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::Integer(i) => <$ty>::try_from(*i)
                        .map_err(|e| QuarryError::Mapping(e.to_string())),
                    other => mismatch(stringify!($ty), other),
                }
            }
        }
    )* }
}

impl_from_value_integer!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(*i != 0),
            other => mismatch("bool", other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            other => mismatch("f64", other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch("String", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => mismatch("Vec<u8>", other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        let Value::Text(text) = value else {
            return mismatch("timestamp", value);
        };
        TIMESTAMP_INPUTS
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
            .ok_or_else(|| QuarryError::Mapping(format!("`{}` is not a timestamp", text)))
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self> {
        NaiveDateTime::from_value(value).map(|naive| naive.and_utc())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
