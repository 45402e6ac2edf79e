//! Filter inputs and the boolean condition tree they fold into.

use std::collections::{BTreeMap, HashMap};

use compact_str::CompactString;

use crate::error::{QuarryError, Result};
use crate::record::{Fields, Record};
use crate::schema::RecordType;
use crate::sql::{Fragment, SqlWriter};
use crate::value::Value;

/// Anything accepted by `where`, `or`, `not` and `having`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Raw conditional fragment with positional parameters.
    Raw(Fragment),
    /// Equality on every pair, ANDed. `record_type` is set when the pairs came
    /// from a partial record, so it can be checked against the query's model.
    Equals {
        fields: Fields,
        record_type: Option<CompactString>,
    },
}

impl Filter {
    /// Empty filters contribute nothing to a query.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Raw(fragment) => fragment.is_empty(),
            Filter::Equals { fields, .. } => fields.is_empty(),
        }
    }
}

impl From<Fragment> for Filter {
    fn from(fragment: Fragment) -> Self {
        Filter::Raw(fragment)
    }
}

impl From<&str> for Filter {
    fn from(text: &str) -> Self {
        Filter::Raw(Fragment::new(text))
    }
}

impl From<String> for Filter {
    fn from(text: String) -> Self {
        Filter::Raw(Fragment::new(text))
    }
}

impl From<Fields> for Filter {
    fn from(fields: Fields) -> Self {
        Filter::Equals {
            fields,
            record_type: None,
        }
    }
}

impl From<Record> for Filter {
    fn from(record: Record) -> Self {
        Filter::from(&record)
    }
}

impl From<&Record> for Filter {
    fn from(record: &Record) -> Self {
        Filter::Equals {
            fields: record.fields().clone(),
            record_type: Some(record.record_type().into()),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Filter
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Filter::from(Fields::from(pairs))
    }
}

impl<K, V> From<HashMap<K, V>> for Filter
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from(map: HashMap<K, V>) -> Self {
        Filter::from(Fields::from(map))
    }
}

impl<K, V> From<BTreeMap<K, V>> for Filter
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        Filter::from(Fields::from(map))
    }
}

/// Boolean combination of filters.
///
/// Precedence is explicit in the tree: `Not` wraps exactly one filter, `And`
/// and `Or` hold their operands in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf(Filter),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    /// `acc AND next`, flattening nested ANDs.
    pub(crate) fn and(acc: Option<Condition>, next: Condition) -> Condition {
        match acc {
            None => next,
            Some(Condition::And(mut items)) => {
                items.push(next);
                Condition::And(items)
            }
            Some(other) => Condition::And(vec![other, next]),
        }
    }

    /// `acc OR next`, flattening nested ORs.
    pub(crate) fn or(acc: Option<Condition>, next: Condition) -> Condition {
        match acc {
            None => next,
            Some(Condition::Or(mut items)) => {
                items.push(next);
                Condition::Or(items)
            }
            Some(other) => Condition::Or(vec![other, next]),
        }
    }

    /// Writes this condition, parenthesised, with columns qualified by the
    /// model's table.
    pub(crate) fn render(&self, ty: &RecordType, out: &mut SqlWriter) -> Result<()> {
        match self {
            Condition::Leaf(Filter::Raw(fragment)) => {
                out.push("(");
                out.push_fragment(fragment)?;
                out.push(")");
            }
            Condition::Leaf(Filter::Equals {
                fields,
                record_type,
            }) => {
                if let Some(record_type) = record_type {
                    if record_type != ty.name() {
                        return Err(QuarryError::Mapping(format!(
                            "`{}` record used as a filter on a `{}` query",
                            record_type,
                            ty.name()
                        )));
                    }
                }
                out.push("(");
                for (i, (field, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(" AND ");
                    }
                    let def = ty.require_field(field)?;
                    out.push_qualified(ty.table(), &def.column);
                    if value.is_null() {
                        out.push(" IS NULL");
                    } else {
                        out.push(" = ");
                        out.push_param(value.clone());
                    }
                }
                out.push(")");
            }
            Condition::Not(inner) => {
                out.push("NOT ");
                inner.render(ty, out)?;
            }
            Condition::And(items) => render_joined(items, " AND ", ty, out)?,
            Condition::Or(items) => render_joined(items, " OR ", ty, out)?,
        }
        Ok(())
    }

    /// Equality pairs that every matching row must satisfy, keyed by field
    /// name. Only leaves reachable through `And` count; anything under `Or`
    /// or `Not` is skipped. Raw fragments count when they are a single
    /// `column = ?` comparison.
    pub(crate) fn equalities(&self, ty: &RecordType, out: &mut Fields) {
        match self {
            Condition::Leaf(Filter::Equals { fields, .. }) => {
                for (field, value) in fields.iter() {
                    if let Some(def) = ty.field_def(field) {
                        out.set(def.name.clone(), value.clone());
                    }
                }
            }
            Condition::Leaf(Filter::Raw(fragment)) => {
                if let Some((column, value)) = simple_equality(fragment, ty.table()) {
                    if let Some(def) = ty.field_def(column) {
                        out.set(def.name.clone(), value.clone());
                    }
                }
            }
            Condition::And(items) => {
                for item in items {
                    item.equalities(ty, out);
                }
            }
            Condition::Not(_) | Condition::Or(_) => {}
        }
    }
}

fn render_joined(
    items: &[Condition],
    separator: &str,
    ty: &RecordType,
    out: &mut SqlWriter,
) -> Result<()> {
    out.push("(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        item.render(ty, out)?;
    }
    out.push(")");
    Ok(())
}

/// Recognises `column = ?` with one scalar parameter. The column may be
/// quoted and may carry a qualifier, but only `table` itself: a comparison
/// on a joined table says nothing about the model's own fields.
fn simple_equality<'a>(fragment: &'a Fragment, table: &str) -> Option<(&'a str, &'a Value)> {
    let [value] = fragment.params() else {
        return None;
    };
    if matches!(value, Value::List(_) | Value::Null) {
        return None;
    }
    let (lhs, rhs) = fragment.text().split_once('=')?;
    if rhs.trim() != "?" {
        return None;
    }
    let lhs = lhs.trim();
    // Reject `a <= ?`, `a != ?` and friends, whose split lands on the `=`.
    if lhs.ends_with(['<', '>', '!']) {
        return None;
    }
    let unquote = |part: &'a str| part.trim().trim_matches(|c| c == '"' || c == '`');
    let column = match lhs.split('.').collect::<Vec<_>>().as_slice() {
        [column] => unquote(*column),
        [qualifier, column] if unquote(*qualifier) == table => unquote(*column),
        _ => return None,
    };
    let valid = !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some((column, value))
}
