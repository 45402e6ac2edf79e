//! Raw result rows and positional scanning into Rust tuples.

use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::value::{FromValue, Value};

/// One result row: column names shared with the rest of its result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the first column named `column`.
    pub fn value(&self, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index)
    }

    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| QuarryError::Mapping(format!("no column named `{}`", column)))?;
        T::from_value(value)
    }

    pub fn get_at<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self
            .value_at(index)
            .ok_or_else(|| QuarryError::Mapping(format!("no column at index {}", index)))?;
        T::from_value(value)
    }

    /// Reads the row positionally into scalar targets.
    ///
    /// ```ignore
    /// let (calendar_id, total): (i64, i64) = row.scan()?;
    /// ```
    pub fn scan<T: FromRow>(&self) -> Result<T> {
        if self.values.len() < T::COLUMN_COUNT {
            return Err(QuarryError::Mapping(format!(
                "row has {} column(s), target needs {}",
                self.values.len(),
                T::COLUMN_COUNT
            )));
        }
        T::from_row_at(self, 0)
    }

    /// JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), serde_json::Value::from(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Extracts a Rust value from a row at a given column offset.
///
/// Tuple impls compose: `(A, B)` reads A at `offset`, then B at
/// `offset + A::COLUMN_COUNT`.
pub trait FromRow: Sized {
    /// Number of columns this type reads from the row.
    const COLUMN_COUNT: usize;

    /// Read this type from `row` starting at column `offset`.
    fn from_row_at(row: &Row, offset: usize) -> Result<Self>;
}

impl<T: FromValue> FromRow for T {
    const COLUMN_COUNT: usize = 1;

    fn from_row_at(row: &Row, offset: usize) -> Result<Self> {
        row.get_at(offset)
    }
}

macro_rules! impl_from_row_tuple {
    ($($T:ident),+) => {
        impl<$($T: FromValue),+> FromRow for ($($T,)+) {
            const COLUMN_COUNT: usize = 0 $(+ { let _ = stringify!($T); 1 })+;

            #[allow(non_snake_case)]
            fn from_row_at(row: &Row, offset: usize) -> Result<Self> {
                let mut __off = offset;
                $(
                    let $T = row.get_at::<$T>(__off)?;
                    __off += 1;
                )+
                let _ = __off;
                Ok(($($T,)+))
            }
        }
    };
}

impl_from_row_tuple!(A);
impl_from_row_tuple!(A, B);
impl_from_row_tuple!(A, B, C);
impl_from_row_tuple!(A, B, C, D);
impl_from_row_tuple!(A, B, C, D, E);
impl_from_row_tuple!(A, B, C, D, E, F);
impl_from_row_tuple!(A, B, C, D, E, F, G);
impl_from_row_tuple!(A, B, C, D, E, F, G, H);

/// A fully fetched result: shared column names and rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Arc<[String]>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn into_rows(self) -> impl Iterator<Item = Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(move |values| Row::new(columns.clone(), values))
    }
}
