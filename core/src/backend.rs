//! The storage backend seam.
//!
//! The core renders statements; a backend runs them. Dialect differences
//! beyond placeholder syntax (upserts, generated keys) are the backend's
//! business.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::{Row, RowSet};
use crate::sql::Statement;

/// Outcome of a statement that is not read back as rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Key generated by the last INSERT, when the backend reports one.
    pub last_insert_id: Option<i64>,
}

/// A forward-only, single-pass sequence of rows.
///
/// Dropping a cursor releases whatever it holds; [`close`](Cursor::close)
/// does the same explicitly and surfaces any error doing so.
pub trait Cursor {
    /// Column names of every row this cursor yields.
    fn columns(&self) -> &[String];

    /// Advances to the next row, `None` once exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;

    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// A connection to some storage engine.
pub trait Backend {
    type Cursor<'c>: Cursor
    where
        Self: 'c;

    fn dialect(&self) -> Dialect;

    /// Runs a statement and returns every row.
    fn query(&self, statement: &Statement) -> Result<RowSet>;

    /// Runs a statement for its side effects.
    fn execute(&self, statement: &Statement) -> Result<ExecResult>;

    /// Opens a cursor over the rows of a statement.
    fn cursor<'c>(&'c self, statement: &Statement) -> Result<Self::Cursor<'c>>;
}

impl<B: Backend + ?Sized> Backend for &B {
    type Cursor<'c>
        = B::Cursor<'c>
    where
        Self: 'c;

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, statement: &Statement) -> Result<RowSet> {
        (**self).query(statement)
    }

    fn execute(&self, statement: &Statement) -> Result<ExecResult> {
        (**self).execute(statement)
    }

    fn cursor<'c>(&'c self, statement: &Statement) -> Result<Self::Cursor<'c>> {
        (**self).cursor(statement)
    }
}

/// Cursor over rows that were already fetched.
///
/// Backends whose native row handle borrows its statement buffer the result
/// and finalize the statement before returning this.
#[derive(Debug)]
pub struct BufferedCursor {
    columns: std::sync::Arc<[String]>,
    rows: std::vec::IntoIter<Vec<crate::value::Value>>,
}

impl BufferedCursor {
    pub fn new(set: RowSet) -> Self {
        Self {
            columns: set.columns,
            rows: set.rows.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self
            .rows
            .next()
            .map(|values| Row::new(self.columns.clone(), values)))
    }
}

impl Iterator for BufferedCursor {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
