//! Renders query descriptors into backend statements.
//!
//! Clause order is fixed: projection, table, joins, where, group, having,
//! order, limit and offset. Builder call order never changes it.

use crate::dialect::Dialect;
use crate::error::{QuarryError, Result};
use crate::record::Fields;
use crate::schema::RecordType;
use crate::sql::{Fragment, SqlWriter, Statement};
use crate::value::Value;

use super::builder::{Query, Selection};

const AGGREGATES: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "total",
    "group_concat",
    "string_agg",
    "array_agg",
];

/// Whether `text` calls an aggregate function, e.g. `sum(length)`.
pub(crate) fn has_aggregate(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    AGGREGATES.iter().any(|name| {
        lower.match_indices(name).any(|(at, _)| {
            let starts_word = at == 0 || !is_ident_byte(bytes[at - 1]);
            let rest = lower[at + name.len()..].trim_start();
            starts_word && rest.starts_with('(')
        })
    })
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Fails with `InvalidAggregate` when `group`/`having` is used without an
/// aggregate in the projection.
pub(crate) fn check_aggregate(query: &Query) -> Result<()> {
    if query.group.is_none() && query.having.is_none() {
        return Ok(());
    }
    let aggregated = match &query.selection {
        Some(Selection::Raw(fragment)) => has_aggregate(fragment.text()),
        Some(Selection::Fields(fields)) => fields.iter().any(|f| has_aggregate(f)),
        None => false,
    };
    if aggregated {
        Ok(())
    } else {
        let clause = if query.group.is_some() { "group" } else { "having" };
        Err(QuarryError::InvalidAggregate(format!(
            "`{}` on `{}` needs a select with an aggregate expression",
            clause, query.model
        )))
    }
}

/// `"table"."column"` as plain text, for building order fragments.
pub(crate) fn qualified(dialect: Dialect, table: &str, column: &str) -> String {
    let mut out = SqlWriter::new(dialect);
    out.push_qualified(table, column);
    out.finish().sql
}

fn push_all_columns(ty: &RecordType, out: &mut SqlWriter) {
    for (i, field) in ty.fields().iter().enumerate() {
        if i > 0 {
            out.push(", ");
        }
        out.push_qualified(ty.table(), &field.column);
    }
}

fn push_projection(query: &Query, ty: &RecordType, out: &mut SqlWriter) -> Result<()> {
    match &query.selection {
        None => push_all_columns(ty, out),
        Some(Selection::Raw(fragment)) => {
            out.push_fragment(fragment)?;
        }
        Some(Selection::Fields(fields)) => {
            for (i, name) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                if name.contains(['.', '(', ' ', '*']) {
                    out.push(name);
                } else {
                    let def = ty.require_field(name)?;
                    out.push_qualified(ty.table(), &def.column);
                }
            }
        }
    }
    Ok(())
}

/// FROM, joins and WHERE. Soft-deleted rows are excluded unless the query
/// is unscoped.
fn push_source(query: &Query, ty: &RecordType, out: &mut SqlWriter) -> Result<()> {
    out.push(" FROM ").push_ident(ty.table());
    for join in &query.joins {
        out.push(" ");
        out.push_fragment(join)?;
    }
    let live_only = ty.soft_delete_column().filter(|_| !query.unscoped);
    match (&query.condition, live_only) {
        (Some(condition), Some(column)) => {
            out.push(" WHERE ");
            condition.render(ty, out)?;
            out.push(" AND ");
            push_live(ty, column, out);
        }
        (Some(condition), None) => {
            out.push(" WHERE ");
            condition.render(ty, out)?;
        }
        (None, Some(column)) => {
            out.push(" WHERE ");
            push_live(ty, column, out);
        }
        (None, None) => {}
    }
    Ok(())
}

fn push_live(ty: &RecordType, column: &str, out: &mut SqlWriter) {
    out.push_qualified(ty.table(), column).push(" IS NULL");
}

fn push_grouping(query: &Query, ty: &RecordType, out: &mut SqlWriter) -> Result<()> {
    if let Some(group) = &query.group {
        out.push(" GROUP BY ");
        out.push_fragment(group)?;
    }
    if let Some(having) = &query.having {
        out.push(" HAVING ");
        having.render(ty, out)?;
    }
    Ok(())
}

fn push_pagination(limit: Option<u64>, offset: Option<u64>, out: &mut SqlWriter) {
    match (limit, offset) {
        (Some(limit), _) => {
            out.push(&format!(" LIMIT {}", limit));
        }
        // SQLite and MySQL need a LIMIT before OFFSET.
        (None, Some(_)) => match out.dialect() {
            Dialect::SQLite => {
                out.push(" LIMIT -1");
            }
            Dialect::MySQL => {
                out.push(" LIMIT 18446744073709551615");
            }
            Dialect::PostgreSQL => {}
        },
        (None, None) => {}
    }
    if let Some(offset) = offset {
        out.push(&format!(" OFFSET {}", offset));
    }
}

/// The full SELECT for `find` and friends.
pub(crate) fn select(query: &Query, ty: &RecordType, dialect: Dialect) -> Result<Statement> {
    check_aggregate(query)?;
    let mut out = SqlWriter::new(dialect);
    out.push("SELECT ");
    push_projection(query, ty, &mut out)?;
    push_source(query, ty, &mut out)?;
    push_grouping(query, ty, &mut out)?;
    if let Some(order) = &query.order {
        out.push(" ORDER BY ");
        out.push_fragment(order)?;
    }
    push_pagination(query.limit, query.offset, &mut out);
    Ok(out.finish())
}

/// `count(*)` over the filtered rows. With `group` or `having` it counts the
/// rows the aggregate query would return, through a sub-select carrying the
/// projection so HAVING can refer to it. Order and pagination are ignored.
pub(crate) fn count(query: &Query, ty: &RecordType, dialect: Dialect) -> Result<Statement> {
    check_aggregate(query)?;
    let mut out = SqlWriter::new(dialect);
    if query.group.is_some() || query.having.is_some() {
        out.push("SELECT count(*) FROM (SELECT ");
        push_projection(query, ty, &mut out)?;
        push_source(query, ty, &mut out)?;
        push_grouping(query, ty, &mut out)?;
        out.push(") AS grouped");
    } else {
        out.push("SELECT count(*)");
        push_source(query, ty, &mut out)?;
    }
    Ok(out.finish())
}

/// `INSERT` of the set fields; `DEFAULT VALUES` when there are none.
pub(crate) fn insert(ty: &RecordType, fields: &Fields, dialect: Dialect) -> Result<Statement> {
    let mut out = SqlWriter::new(dialect);
    out.push("INSERT INTO ").push_ident(ty.table());
    if fields.is_empty() {
        out.push(" DEFAULT VALUES");
        return Ok(out.finish());
    }
    out.push(" (");
    for (i, (field, _)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(", ");
        }
        out.push_ident(&ty.require_field(field)?.column);
    }
    out.push(") VALUES (");
    for (i, (_, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(", ");
        }
        out.push_param(value.clone());
    }
    out.push(")");
    Ok(out.finish())
}

/// `UPDATE` of every set field except the primary key, keyed by `key`.
/// `None` when there is nothing to write.
pub(crate) fn update(
    ty: &RecordType,
    fields: &Fields,
    key: &Value,
    dialect: Dialect,
) -> Result<Option<Statement>> {
    let pk = ty.primary_key_field();
    let mut out = SqlWriter::new(dialect);
    out.push("UPDATE ").push_ident(ty.table()).push(" SET ");
    let mut written = 0;
    for (field, value) in fields.iter() {
        let def = ty.require_field(field)?;
        if def.name == pk {
            continue;
        }
        if written > 0 {
            out.push(", ");
        }
        out.push_ident(&def.column).push(" = ");
        out.push_param(value.clone());
        written += 1;
    }
    if written == 0 {
        return Ok(None);
    }
    out.push(" WHERE ").push_ident(ty.primary_key_column()).push(" = ");
    out.push_param(key.clone());
    Ok(Some(out.finish()))
}

/// Every declared column of `ty` for live rows whose `column` is in `keys`,
/// ordered by primary key.
pub(crate) fn select_in(
    ty: &RecordType,
    column: &str,
    keys: Vec<Value>,
    dialect: Dialect,
) -> Statement {
    let mut out = SqlWriter::new(dialect);
    out.push("SELECT ");
    push_all_columns(ty, &mut out);
    out.push(" FROM ").push_ident(ty.table()).push(" WHERE ");
    out.push_qualified(ty.table(), column).push(" IN (");
    out.push_param(Value::List(keys));
    out.push(")");
    if let Some(deleted) = ty.soft_delete_column() {
        out.push(" AND ");
        push_live(ty, deleted, &mut out);
    }
    out.push(" ORDER BY ");
    out.push_qualified(ty.table(), ty.primary_key_column());
    out.finish()
}

/// `UPDATE ... SET <deleted> = ? WHERE <pk> = ?`, the soft form of a delete.
pub(crate) fn mark_deleted(
    ty: &RecordType,
    column: &str,
    at: Value,
    key: &Value,
    dialect: Dialect,
) -> Statement {
    let mut out = SqlWriter::new(dialect);
    out.push("UPDATE ").push_ident(ty.table()).push(" SET ");
    out.push_ident(column).push(" = ");
    out.push_param(at);
    out.push(" WHERE ").push_ident(ty.primary_key_column()).push(" = ");
    out.push_param(key.clone());
    out.finish()
}

/// `DELETE ... WHERE <pk> = ?`.
pub(crate) fn delete(ty: &RecordType, key: &Value, dialect: Dialect) -> Statement {
    let mut out = SqlWriter::new(dialect);
    out.push("DELETE FROM ").push_ident(ty.table());
    out.push(" WHERE ").push_ident(ty.primary_key_column()).push(" = ");
    out.push_param(key.clone());
    out.finish()
}

/// Inserts the `(owner, target)` pair into a link table unless it is
/// already there.
pub(crate) fn insert_link(
    table: &str,
    owner_column: &str,
    target_column: &str,
    owner: &Value,
    target: &Value,
    dialect: Dialect,
) -> Statement {
    let mut out = SqlWriter::new(dialect);
    out.push("INSERT INTO ").push_ident(table).push(" (");
    out.push_ident(owner_column).push(", ").push_ident(target_column);
    out.push(") SELECT ");
    out.push_param(owner.clone());
    out.push(", ");
    out.push_param(target.clone());
    out.push(" WHERE NOT EXISTS (SELECT 1 FROM ").push_ident(table).push(" WHERE ");
    out.push_ident(owner_column).push(" = ");
    out.push_param(owner.clone());
    out.push(" AND ").push_ident(target_column).push(" = ");
    out.push_param(target.clone());
    out.push(")");
    out.finish()
}

/// `(owner, target)` key pairs of a link table for the given owner keys.
pub(crate) fn link_rows(
    table: &str,
    owner_column: &str,
    target_column: &str,
    keys: Vec<Value>,
    dialect: Dialect,
) -> Statement {
    let mut out = SqlWriter::new(dialect);
    out.push("SELECT ");
    out.push_qualified(table, owner_column).push(", ");
    out.push_qualified(table, target_column);
    out.push(" FROM ").push_ident(table).push(" WHERE ");
    out.push_qualified(table, owner_column).push(" IN (");
    out.push_param(Value::List(keys));
    out.push(")");
    out.finish()
}

/// `ORDER BY` fragment on the primary key.
pub(crate) fn primary_key_order(ty: &RecordType, dialect: Dialect, descending: bool) -> Fragment {
    let column = qualified(dialect, ty.table(), ty.primary_key_column());
    if descending {
        Fragment::new(format!("{} DESC", column))
    } else {
        Fragment::new(column)
    }
}
