//! Executes query descriptors against a backend.

use std::sync::Arc;

use compact_str::CompactString;
use serde::de::DeserializeOwned;

use crate::backend::{Backend, ExecResult};
use crate::config::Config;
use crate::dialect::Dialect;
use crate::error::{QuarryError, Result};
use crate::quarry_trace_query;
use crate::query::compile;
use crate::query::{Query, Selection};
use crate::record::Record;
use crate::relation;
use crate::row::RowSet;
use crate::schema::{RecordType, Registry};
use crate::sql::{Fragment, Statement};
use crate::value::FromValue;

/// Database context: a backend plus the record types it serves.
///
/// Every operation takes `&self`; there is no ambient handle.
///
/// ```ignore
/// let mut db = Quarry::new(RusqliteBackend::open_in_memory()?);
/// db.register(RecordType::new("User", "users").field("id").field("user_name"))?;
///
/// let ford = db.first(Query::model("User").r#where([("user_name", "fprefect")]))?;
/// ```
#[derive(Debug, Clone)]
pub struct Quarry<B> {
    backend: B,
    registry: Arc<Registry>,
    config: Config,
}

impl<B: Backend> Quarry<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, Config::default())
    }

    pub fn with_config(backend: B, config: Config) -> Self {
        Self {
            backend,
            registry: Arc::new(Registry::new()),
            config,
        }
    }

    /// Registers a record type. See [`Registry::register`].
    pub fn register(&mut self, record_type: RecordType) -> Result<&mut Self> {
        Arc::make_mut(&mut self.registry).register(record_type)?;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// A handle on the same backend and registry that logs every statement
    /// at info level.
    pub fn debug(&self) -> Quarry<&B> {
        Quarry {
            backend: &self.backend,
            registry: Arc::clone(&self.registry),
            config: Config {
                debug: true,
                ..self.config
            },
        }
    }

    /// Every matching record, with requested relations attached. Empty when
    /// nothing matches.
    pub fn find(&self, query: Query) -> Result<Vec<Record>> {
        let ty = self.registry.describe(&query.model)?;
        let plan = relation::plan(&self.registry, ty, &query.preloads)?;
        let statement = compile::select(&query, ty, self.dialect())?;
        let mut records = self.materialize(ty, self.fetch(&statement)?)?;
        relation::resolve(self, ty, &plan, &mut records)?;
        Ok(records)
    }

    /// First record by primary key, unless the query is already ordered.
    pub fn first(&self, query: Query) -> Result<Record> {
        self.single(query, Some(false))
    }

    /// Last record by primary key, unless the query is already ordered.
    pub fn last(&self, query: Query) -> Result<Record> {
        self.single(query, Some(true))
    }

    /// Any one matching record, without imposing an order.
    pub fn take(&self, query: Query) -> Result<Record> {
        self.single(query, None)
    }

    fn single(&self, mut query: Query, descending: Option<bool>) -> Result<Record> {
        if let Some(descending) = descending {
            if query.order.is_none() {
                let ty = self.registry.describe(&query.model)?;
                query.order = Some(compile::primary_key_order(ty, self.dialect(), descending));
            }
        }
        query.limit = Some(1);
        self.find(query)?
            .into_iter()
            .next()
            .ok_or(QuarryError::NotFound)
    }

    /// Number of matching rows, or of groups when the query is grouped.
    pub fn count(&self, query: Query) -> Result<i64> {
        let ty = self.registry.describe(&query.model)?;
        let statement = compile::count(&query, ty, self.dialect())?;
        let set = self.fetch(&statement)?;
        match set.rows.first().and_then(|row| row.first()) {
            Some(value) => i64::from_value(value),
            None => Ok(0),
        }
    }

    /// One column of every matching row, in result order.
    pub fn pluck<T: FromValue>(&self, mut query: Query, column: &str) -> Result<Vec<T>> {
        let ty = self.registry.describe(&query.model)?;
        query.selection = Some(Selection::Fields(vec![CompactString::from(column)]));
        let statement = compile::select(&query, ty, self.dialect())?;
        self.fetch(&statement)?
            .rows
            .iter()
            .map(|row| match row.first() {
                Some(value) => T::from_value(value),
                None => Err(QuarryError::Mapping(format!("`{}` returned no column", column))),
            })
            .collect()
    }

    /// Deserializes every result row into `T` by column name.
    ///
    /// Use `#[serde(rename = "...")]` to map a field onto a differently named
    /// column.
    pub fn scan<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>> {
        let ty = self.registry.describe(&query.model)?;
        let statement = compile::select(&query, ty, self.dialect())?;
        self.fetch(&statement)?
            .into_rows()
            .map(|row| Ok(serde_json::from_value(row.to_json())?))
            .collect()
    }

    /// A forward-only cursor over the raw result rows.
    pub fn rows(&self, query: Query) -> Result<B::Cursor<'_>> {
        let ty = self.registry.describe(&query.model)?;
        let statement = compile::select(&query, ty, self.dialect())?;
        quarry_trace_query!(&statement.sql, statement.params.len(), self.config.debug);
        self.backend.cursor(&statement)
    }

    /// Runs a backend-native statement for its side effects.
    pub fn exec(&self, statement: impl Into<Fragment>) -> Result<ExecResult> {
        let statement = Statement::from_fragment(self.dialect(), &statement.into())?;
        self.run(&statement)
    }

    pub(crate) fn fetch(&self, statement: &Statement) -> Result<RowSet> {
        quarry_trace_query!(&statement.sql, statement.params.len(), self.config.debug);
        self.backend.query(statement)
    }

    pub(crate) fn run(&self, statement: &Statement) -> Result<ExecResult> {
        quarry_trace_query!(&statement.sql, statement.params.len(), self.config.debug);
        self.backend.execute(statement)
    }

    /// Maps result columns onto the fields of `ty` by column name.
    pub(crate) fn materialize(&self, ty: &RecordType, set: RowSet) -> Result<Vec<Record>> {
        let mut targets = Vec::with_capacity(set.columns.len());
        for column in set.columns.iter() {
            let field = ty
                .field_for_column(column)
                .or_else(|| ty.field_def(column))
                .map(|def| def.name.clone());
            if field.is_none() && self.config.strict_columns {
                return Err(QuarryError::Mapping(format!(
                    "column `{}` matches no field of `{}`",
                    column,
                    ty.name()
                )));
            }
            targets.push(field);
        }

        Ok(set
            .rows
            .into_iter()
            .map(|values| {
                let mut record = Record::new(ty.name());
                for (field, value) in targets.iter().zip(values) {
                    if let Some(field) = field {
                        record.insert(field.clone(), value);
                    }
                }
                record
            })
            .collect())
    }
}
