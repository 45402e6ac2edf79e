//! SQL dialects understood by the statement renderer.

use std::borrow::Cow;

/// The SQL flavour a backend speaks.
///
/// Only placeholder syntax differs between dialects as far as the renderer is
/// concerned; everything else the core emits is portable SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    SQLite,
    PostgreSQL,
    MySQL,
}

impl Dialect {
    /// Renders a placeholder for this dialect with the given 1-based index.
    ///
    /// Returns `Cow::Borrowed("?")` for SQLite/MySQL (zero allocation),
    /// `Cow::Owned` for PostgreSQL numbered placeholders.
    ///
    /// # Examples
    /// - PostgreSQL: `$1`, `$2`, `$3`
    /// - SQLite/MySQL: `?`
    #[inline]
    pub fn render_placeholder(&self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::PostgreSQL => Cow::Owned(format!("${}", index)),
            Dialect::SQLite | Dialect::MySQL => Cow::Borrowed("?"),
        }
    }

    /// Quote character for identifiers.
    #[inline]
    pub const fn quote(&self) -> char {
        match self {
            Dialect::MySQL => '`',
            Dialect::SQLite | Dialect::PostgreSQL => '"',
        }
    }
}
