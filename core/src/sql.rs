//! Raw SQL fragments and the statement writer.

use std::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::dialect::Dialect;
use crate::error::{QuarryError, Result};
use crate::value::Value;

/// Builds a [`Fragment`] from SQL text with `?` placeholders and the values
/// bound to them, in order.
///
/// ```
/// use quarry_core::raw;
///
/// let frag = raw!("user_name like ? and first_name = ?", "%mac%", "Tricia");
/// assert_eq!(frag.params().len(), 2);
/// ```
#[macro_export]
macro_rules! raw {
    ($text:expr $(,)?) => {
        $crate::sql::Fragment::new($text)
    };
    ($text:expr, $($param:expr),+ $(,)?) => {
        $crate::sql::Fragment::new($text)$(.bind($param))+
    };
}

/// A backend-native SQL fragment with positional `?` parameters.
///
/// A [`Value::List`] parameter expands to a comma separated placeholder list,
/// so `raw!("user_name in (?)", vec!["adent", "tmacmillan"])` renders as
/// `user_name in (?, ?)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    text: CompactString,
    params: Vec<Value>,
}

impl Fragment {
    pub fn new(text: impl Into<CompactString>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Binds the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// `true` when the fragment contributes nothing.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::new(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::new(text)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A fully rendered statement, ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Renders a raw fragment on its own.
    pub fn from_fragment(dialect: Dialect, fragment: &Fragment) -> Result<Self> {
        let mut writer = SqlWriter::new(dialect);
        writer.push_fragment(fragment)?;
        Ok(writer.finish())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Accumulates SQL text and bound parameters, numbering placeholders for the
/// target dialect as they are written.
#[derive(Debug)]
pub struct SqlWriter {
    dialect: Dialect,
    sql: String,
    params: SmallVec<[Value; 8]>,
}

impl SqlWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(128),
            params: SmallVec::new(),
        }
    }

    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Writes a quoted identifier.
    pub fn push_ident(&mut self, ident: &str) -> &mut Self {
        let quote = self.dialect.quote();
        self.sql.push(quote);
        for c in ident.chars() {
            if c == quote {
                self.sql.push(quote);
            }
            self.sql.push(c);
        }
        self.sql.push(quote);
        self
    }

    /// Writes `"table"."column"`.
    pub fn push_qualified(&mut self, table: &str, column: &str) -> &mut Self {
        self.push_ident(table).push(".").push_ident(column)
    }

    /// Writes a placeholder bound to `value`. Lists expand to one placeholder
    /// per element; an empty list renders `NULL` so `IN (?)` matches nothing.
    pub fn push_param(&mut self, value: Value) -> &mut Self {
        match value {
            Value::List(items) => {
                if items.is_empty() {
                    self.sql.push_str("NULL");
                }
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.push_param(item);
                }
            }
            value => {
                self.params.push(value);
                let placeholder = self.dialect.render_placeholder(self.params.len());
                self.sql.push_str(&placeholder);
            }
        }
        self
    }

    /// Writes a raw fragment, binding its parameters to its `?` placeholders
    /// in order. Question marks inside quoted strings or identifiers are left
    /// alone.
    pub fn push_fragment(&mut self, fragment: &Fragment) -> Result<&mut Self> {
        let mut params = fragment.params().iter();
        let mut quoted: Option<char> = None;
        let mut placeholders = 0usize;

        for c in fragment.text().chars() {
            match (quoted, c) {
                (Some(q), c) if c == q => {
                    quoted = None;
                    self.sql.push(c);
                }
                (Some(_), c) => self.sql.push(c),
                (None, '\'' | '"' | '`') => {
                    quoted = Some(c);
                    self.sql.push(c);
                }
                (None, '?') => {
                    placeholders += 1;
                    match params.next() {
                        Some(value) => {
                            self.push_param(value.clone());
                        }
                        None => break,
                    }
                }
                (None, c) => self.sql.push(c),
            }
        }

        if placeholders != fragment.params().len() {
            return Err(QuarryError::Statement(format!(
                "fragment `{}` has {} placeholder(s) but {} parameter(s)",
                fragment.text(),
                placeholders,
                fragment.params().len()
            )));
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params.into_vec(),
        }
    }
}
