//! In-memory record instances and equality field lists.

use std::collections::{BTreeMap, HashMap};

use compact_str::CompactString;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;

use crate::error::Result;
use crate::value::{FromValue, Value};

/// Ordered `field = value` pairs.
///
/// Used for the mapping form of a filter, for `attrs`/`assign` defaults and
/// as the storage behind [`Record`]. Setting a field twice keeps the first
/// position and the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pairs: SmallVec<[(CompactString, Value); 4]>,
}

impl Fields {
    pub const fn new() -> Self {
        Self {
            pairs: SmallVec::new_const(),
        }
    }

    pub fn set(&mut self, field: impl Into<CompactString>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.pairs.push((field, value)),
        }
    }

    pub fn with(mut self, field: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.pairs
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let pos = self.pairs.iter().position(|(name, _)| name == field)?;
        Some(self.pairs.remove(pos).1)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Applies every pair of `other` over `self`.
    pub fn merge(&mut self, other: &Fields) {
        for (field, value) in other.iter() {
            self.set(field, value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.set(k, v);
        }
        fields
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Fields
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> From<HashMap<K, V>> for Fields
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from(map: HashMap<K, V>) -> Self {
        // HashMap order is unspecified; sort so rendered SQL is stable.
        let mut pairs: Vec<(CompactString, Value)> =
            map.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.into_iter().collect()
    }
}

impl<K, V> From<BTreeMap<K, V>> for Fields
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Record> for Fields {
    fn from(record: Record) -> Self {
        record.fields
    }
}

impl From<&Record> for Fields {
    fn from(record: &Record) -> Self {
        record.fields.clone()
    }
}

/// Loaded relation data attached to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// has-one / belongs-to
    One(Option<Box<Record>>),
    /// has-many / many-to-many
    Many(Vec<Record>),
}

impl Related {
    /// All attached records, whatever the cardinality.
    pub fn records(&self) -> Vec<&Record> {
        match self {
            Related::One(one) => one.iter().map(|record| &**record).collect(),
            Related::Many(many) => many.iter().collect(),
        }
    }

    pub(crate) fn records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            Related::One(one) => one.iter_mut().map(|record| &mut **record).collect(),
            Related::Many(many) => many.iter_mut().collect(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Related::One(None) => serde_json::Value::Null,
            Related::One(Some(record)) => record.to_json(),
            Related::Many(records) => {
                serde_json::Value::Array(records.iter().map(Record::to_json).collect())
            }
        }
    }
}

/// A value of a registered record type.
///
/// Fields that were never set are absent, not zero: a partial record used as
/// a filter contributes exactly the fields that were set. Relations are
/// present after a preload, or when attached with [`with_one`](Self::with_one)
/// and [`with_many`](Self::with_many) so that `create`/`save` write them too.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    record_type: CompactString,
    fields: Fields,
    relations: BTreeMap<CompactString, Related>,
}

impl Record {
    pub fn new(record_type: impl Into<CompactString>) -> Self {
        Self {
            record_type: record_type.into(),
            fields: Fields::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn from_fields(record_type: impl Into<CompactString>, fields: Fields) -> Self {
        Self {
            record_type: record_type.into(),
            fields,
            relations: BTreeMap::new(),
        }
    }

    /// Attaches the single record of a has-one or belongs-to relation.
    pub fn with_one(mut self, name: impl Into<CompactString>, record: Record) -> Self {
        self.relations.insert(name.into(), Related::One(Some(Box::new(record))));
        self
    }

    /// Attaches the records of a has-many or many-to-many relation.
    pub fn with_many(mut self, name: impl Into<CompactString>, records: Vec<Record>) -> Self {
        self.relations.insert(name.into(), Related::Many(records));
        self
    }

    /// Builder-style setter.
    pub fn set(mut self, field: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.fields.set(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<CompactString>, value: impl Into<Value>) {
        self.fields.set(field, value);
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Reads a field into a Rust scalar. Unset fields read as NULL.
    pub fn get<T: FromValue>(&self, field: &str) -> Result<T> {
        T::from_value(self.fields.get(field).unwrap_or(&Value::Null))
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// The single related record of a has-one / belongs-to relation.
    pub fn one(&self, name: &str) -> Option<&Record> {
        match self.relations.get(name)? {
            Related::One(one) => one.as_deref(),
            Related::Many(_) => None,
        }
    }

    /// The related records of a has-many / many-to-many relation, empty when
    /// not loaded.
    pub fn many(&self, name: &str) -> &[Record] {
        match self.relations.get(name) {
            Some(Related::Many(records)) => records,
            _ => &[],
        }
    }

    pub(crate) fn attach(&mut self, name: &str, related: Related) {
        self.relations.insert(name.into(), related);
    }

    pub(crate) fn take_relations(&mut self) -> BTreeMap<CompactString, Related> {
        std::mem::take(&mut self.relations)
    }

    pub(crate) fn restore_relations(&mut self, relations: BTreeMap<CompactString, Related>) {
        self.relations = relations;
    }

    /// JSON object of the set fields plus loaded relations.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (field, value) in self.fields.iter() {
            map.insert(field.to_owned(), value.clone().into());
        }
        for (name, related) in &self.relations {
            map.insert(name.to_string(), related.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Deserializes this record (and loaded relations) into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}
