//! Fetch a matching record, or build one from defaults.
//!
//! `attrs` values only reach a record built because nothing matched.
//! `assign` values are written onto the returned record in both cases.

use crate::backend::Backend;
use crate::error::Result;
use crate::executor::Quarry;
use crate::query::{Filter, Query};
use crate::record::{Fields, Record};

impl<B: Backend> Quarry<B> {
    /// The first record matching `query` and `conditions`, or a new unsaved
    /// record seeded from their equality clauses, the query's `attrs` and its
    /// `assign`. Never writes to the backend.
    ///
    /// ```ignore
    /// let user = db.first_or_init(
    ///     Query::model("User").attrs([("first_name", "Eddie")]),
    ///     [("user_name", "adent")],
    /// )?;
    /// ```
    pub fn first_or_init(&self, query: Query, conditions: impl Into<Filter>) -> Result<Record> {
        let query = query.r#where(conditions);
        match self.lookup(&query)? {
            Some(mut found) => {
                found.fields_mut().merge(&query.assign);
                Ok(found)
            }
            None => self.seed(&query),
        }
    }

    /// Like [`first_or_init`](Self::first_or_init), but a built record is
    /// inserted, and `assign` values on a found record are saved.
    pub fn first_or_create(&self, query: Query, conditions: impl Into<Filter>) -> Result<Record> {
        let query = query.r#where(conditions);
        match self.lookup(&query)? {
            Some(found) if query.assign.is_empty() => Ok(found),
            Some(mut found) => {
                found.fields_mut().merge(&query.assign);
                let mut changes = query.assign.clone();
                let ty = self.registry().describe(found.record_type())?;
                if let Some(key) = found.value(ty.primary_key_field()) {
                    changes.set(ty.primary_key_field(), key.clone());
                }
                let saved = self.save(Record::from_fields(found.record_type(), changes))?;
                found.fields_mut().merge(saved.fields());
                Ok(found)
            }
            None => {
                let record = self.seed(&query)?;
                self.create(record)
            }
        }
    }

    /// `first`, with `NotFound` turned into `None`.
    fn lookup(&self, query: &Query) -> Result<Option<Record>> {
        match self.first(query.clone()) {
            Ok(found) => Ok(Some(found)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn seed(&self, query: &Query) -> Result<Record> {
        let ty = self.registry().describe(&query.model)?;
        let mut fields = Fields::new();
        if let Some(condition) = &query.condition {
            condition.equalities(ty, &mut fields);
        }
        fields.merge(&query.attrs);
        fields.merge(&query.assign);
        Ok(Record::from_fields(ty.name(), fields))
    }
}
