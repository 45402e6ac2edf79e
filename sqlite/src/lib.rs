//! SQLite storage backend for quarry
//!
//! This crate runs statements rendered by `quarry-core` on a rusqlite
//! [`Connection`].

pub mod values;

use std::path::Path;

use quarry_core::{
    Backend, BufferedCursor, Dialect, ExecResult, QuarryError, Result, RowSet, Statement, Value,
};
use rusqlite::{Connection, params_from_iter};

pub use values::{SqliteParam, SqliteValue};

/// Backend over a single rusqlite connection.
#[derive(Debug)]
pub struct RusqliteBackend {
    conn: Connection,
}

impl RusqliteBackend {
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.as_ref().display(), "quarry.sqlite.open");
        Connection::open(path)
            .map(Self::new)
            .map_err(QuarryError::backend)
    }

    pub fn open_in_memory() -> Result<Self> {
        Connection::open_in_memory()
            .map(Self::new)
            .map_err(QuarryError::backend)
    }

    /// Gets a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn mut_conn(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl From<Connection> for RusqliteBackend {
    fn from(conn: Connection) -> Self {
        Self::new(conn)
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}

impl Backend for RusqliteBackend {
    type Cursor<'c>
        = BufferedCursor
    where
        Self: 'c;

    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn query(&self, statement: &Statement) -> Result<RowSet> {
        let mut stmt = self.conn.prepare(&statement.sql).map_err(QuarryError::backend)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();

        let rows = stmt
            .query_map(params_from_iter(statement.params.iter().map(SqliteParam)), |row| {
                (0..width)
                    .map(|i| row.get::<_, SqliteValue>(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(QuarryError::backend)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(QuarryError::backend)?;

        Ok(RowSet::new(columns, rows))
    }

    fn execute(&self, statement: &Statement) -> Result<ExecResult> {
        let mut stmt = self.conn.prepare(&statement.sql).map_err(QuarryError::backend)?;
        let params = params_from_iter(statement.params.iter().map(SqliteParam));

        // rusqlite refuses `execute` on statements that return rows; drain them.
        let rows_affected = if stmt.column_count() > 0 {
            let mut rows = stmt.query(params).map_err(QuarryError::backend)?;
            while rows.next().map_err(QuarryError::backend)?.is_some() {}
            0
        } else {
            stmt.execute(params).map_err(QuarryError::backend)? as u64
        };

        let last_insert_id = (rows_affected > 0 && is_insert(&statement.sql))
            .then(|| self.conn.last_insert_rowid());
        Ok(ExecResult {
            rows_affected,
            last_insert_id,
        })
    }

    fn cursor<'c>(&'c self, statement: &Statement) -> Result<Self::Cursor<'c>> {
        self.query(statement).map(BufferedCursor::new)
    }
}
