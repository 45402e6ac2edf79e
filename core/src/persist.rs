//! Writes: insert, update-or-insert and delete, cascading into attached
//! relations.
//!
//! A belongs-to parent is written before its owner so the owner's foreign key
//! can be set from it. Has-one and has-many children are written after the
//! owner with their foreign key pointing back at it. Many-to-many targets are
//! written when they have no key yet, then linked through the join table.

use std::collections::BTreeMap;

use chrono::Utc;
use compact_str::CompactString;

use crate::backend::Backend;
use crate::error::{QuarryError, Result};
use crate::executor::Quarry;
use crate::quarry_trace_cascade;
use crate::query::compile;
use crate::record::{Record, Related};
use crate::schema::{RecordType, RelationDef, RelationKind};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write {
    Insert,
    Upsert,
}

/// The primary key of `record`, when it is set and not NULL.
fn key_of(ty: &RecordType, record: &Record) -> Option<Value> {
    record
        .value(ty.primary_key_field())
        .filter(|key| !key.is_null())
        .cloned()
}

fn is_blank(record: &Record, field: &str) -> bool {
    record.value(field).is_none_or(Value::is_null)
}

impl<B: Backend> Quarry<B> {
    /// Inserts a record and returns it with its generated primary key.
    ///
    /// Declared timestamps that are not set are stamped with the current
    /// time. Attached relations are written as well.
    pub fn create(&self, record: Record) -> Result<Record> {
        self.persist(record, Write::Insert)
    }

    /// Updates a record by primary key, inserting it when it has no key or
    /// no row was updated. The updated-at timestamp, when declared, is always
    /// refreshed. Attached relations are written as well.
    pub fn save(&self, record: Record) -> Result<Record> {
        self.persist(record, Write::Upsert)
    }

    /// Deletes a record by primary key and returns the number of rows hit.
    ///
    /// Types declaring soft delete get their deletion marker stamped instead,
    /// which hides the row from every later read that is not unscoped.
    pub fn delete(&self, record: &Record) -> Result<u64> {
        let ty = self.registry().describe(record.record_type())?;
        let key = require_key(ty, record)?;
        let statement = match ty.soft_delete_column() {
            Some(column) => {
                compile::mark_deleted(ty, column, Value::from(Utc::now()), &key, self.dialect())
            }
            None => compile::delete(ty, &key, self.dialect()),
        };
        Ok(self.run(&statement)?.rows_affected)
    }

    /// Removes the row for good, even on a soft-deleting type.
    pub fn purge(&self, record: &Record) -> Result<u64> {
        let ty = self.registry().describe(record.record_type())?;
        let key = require_key(ty, record)?;
        let statement = compile::delete(ty, &key, self.dialect());
        Ok(self.run(&statement)?.rows_affected)
    }

    fn persist(&self, mut record: Record, write: Write) -> Result<Record> {
        let ty = self.registry().describe(record.record_type())?;
        let mut relations = record.take_relations();
        let defs = relations
            .keys()
            .map(|name| {
                ty.relation_def(name)
                    .ok_or_else(|| QuarryError::unknown_relation(ty.name(), name.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;
        for (def, related) in defs.iter().zip(relations.values()) {
            check_attached(def, related)?;
        }

        for def in defs.iter().filter(|def| matches!(def.kind, RelationKind::BelongsTo)) {
            self.write_parent(def, &mut record, &mut relations)?;
        }
        let mut record = match write {
            Write::Insert => self.insert_row(ty, record)?,
            Write::Upsert => self.upsert_row(ty, record)?,
        };
        for def in defs.iter().filter(|def| !matches!(def.kind, RelationKind::BelongsTo)) {
            self.write_children(ty, def, &record, &mut relations)?;
        }
        record.restore_relations(relations);
        Ok(record)
    }

    /// Writes a keyless belongs-to parent and points the owner at it.
    fn write_parent(
        &self,
        def: &RelationDef,
        owner: &mut Record,
        relations: &mut BTreeMap<CompactString, Related>,
    ) -> Result<()> {
        let Some(Related::One(Some(parent))) = relations.get_mut(def.name.as_str()) else {
            return Ok(());
        };
        let target = self.registry().describe(&def.target)?;
        if key_of(target, parent).is_none() {
            let unsaved = std::mem::replace(&mut **parent, Record::new(target.name()));
            **parent = self.save(unsaved)?;
            quarry_trace_cascade!(owner.record_type(), def.name, 1);
        }
        let key = require_key(target, parent)?;
        owner.insert(def.foreign_key.clone(), key);
        Ok(())
    }

    fn write_children(
        &self,
        owner_ty: &RecordType,
        def: &RelationDef,
        owner: &Record,
        relations: &mut BTreeMap<CompactString, Related>,
    ) -> Result<()> {
        let Some(related) = relations.get_mut(def.name.as_str()) else {
            return Ok(());
        };
        let children = related.records_mut();
        if children.is_empty() {
            return Ok(());
        }
        let owner_key = require_key(owner_ty, owner)?;
        let written = children.len();
        for child in children {
            let target = self.registry().describe(&def.target)?;
            match &def.kind {
                RelationKind::HasOne | RelationKind::HasMany => {
                    child.insert(def.foreign_key.clone(), owner_key.clone());
                    let unsaved = std::mem::replace(child, Record::new(target.name()));
                    *child = self.save(unsaved)?;
                }
                RelationKind::ManyToMany(join) => {
                    if key_of(target, child).is_none() {
                        let unsaved = std::mem::replace(child, Record::new(target.name()));
                        *child = self.save(unsaved)?;
                    }
                    let target_key = require_key(target, child)?;
                    let statement = compile::insert_link(
                        &join.table,
                        &join.owner_column,
                        &join.target_column,
                        &owner_key,
                        &target_key,
                        self.dialect(),
                    );
                    self.run(&statement)?;
                }
                RelationKind::BelongsTo => {}
            }
        }
        quarry_trace_cascade!(owner.record_type(), def.name, written);
        #[cfg(not(feature = "tracing"))]
        let _ = written;
        Ok(())
    }

    fn insert_row(&self, ty: &RecordType, mut record: Record) -> Result<Record> {
        if let Some(stamps) = ty.timestamp_fields() {
            let now = Value::from(Utc::now());
            for field in [&stamps.created, &stamps.updated] {
                if is_blank(&record, field) {
                    record.insert(field.clone(), now.clone());
                }
            }
        }
        let statement = compile::insert(ty, record.fields(), self.dialect())?;
        let result = self.run(&statement)?;
        if key_of(ty, &record).is_none() {
            if let Some(id) = result.last_insert_id {
                record.insert(ty.primary_key_field(), id);
            }
        }
        Ok(record)
    }

    fn upsert_row(&self, ty: &RecordType, mut record: Record) -> Result<Record> {
        let Some(key) = key_of(ty, &record) else {
            return self.insert_row(ty, record);
        };
        if let Some(stamps) = ty.timestamp_fields() {
            record.insert(stamps.updated.clone(), Utc::now());
        }
        if let Some(statement) = compile::update(ty, record.fields(), &key, self.dialect())? {
            if self.run(&statement)?.rows_affected == 0 {
                return self.insert_row(ty, record);
            }
        }
        Ok(record)
    }
}

fn check_attached(def: &RelationDef, related: &Related) -> Result<()> {
    let mismatch = related
        .records()
        .into_iter()
        .find(|record| record.record_type() != def.target.as_str());
    match mismatch {
        Some(record) => Err(QuarryError::Mapping(format!(
            "`{}` record attached as `{}`, which holds `{}`",
            record.record_type(),
            def.name,
            def.target
        ))),
        None => Ok(()),
    }
}

fn require_key(ty: &RecordType, record: &Record) -> Result<Value> {
    key_of(ty, record).ok_or_else(|| {
        QuarryError::Mapping(format!("`{}` record has no primary key", ty.name()))
    })
}
