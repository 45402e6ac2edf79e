//! Record type metadata and the registry that owns it.
//!
//! Record types are declared explicitly at startup instead of being derived
//! from runtime type inspection:
//!
//! ```
//! use quarry_core::schema::{JoinTable, RecordType};
//!
//! let user = RecordType::new("User", "users")
//!     .field("id")
//!     .field("user_name")
//!     .has_one("calendar", "Calendar", "user_id");
//!
//! let appointment = RecordType::new("Appointment", "appointments")
//!     .field("id")
//!     .field("subject")
//!     .field("calendar_id")
//!     .many_to_many(
//!         "attendees",
//!         "User",
//!         JoinTable::new("appointment_user", "appointment_id", "user_id"),
//!     );
//! # let _ = (user, appointment);
//! ```

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::error::{QuarryError, Result};

/// A declared field and the column backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: CompactString,
    pub column: CompactString,
}

/// Link table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    /// The link table name (e.g., `"appointment_user"`).
    pub table: CompactString,
    /// Column pointing at the owner's primary key.
    pub owner_column: CompactString,
    /// Column pointing at the target's primary key.
    pub target_column: CompactString,
}

impl JoinTable {
    pub fn new(
        table: impl Into<CompactString>,
        owner_column: impl Into<CompactString>,
        target_column: impl Into<CompactString>,
    ) -> Self {
        Self {
            table: table.into(),
            owner_column: owner_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// Cardinality of a relation and where its keys live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// One-to-one: the target holds a foreign key to the owner's primary key.
    HasOne,
    /// One-to-many: the targets hold a foreign key to the owner's primary key.
    HasMany,
    /// Many-to-one: the owner holds a foreign key to the target's primary key.
    BelongsTo,
    /// Many-to-many through a link table.
    ManyToMany(JoinTable),
}

impl RelationKind {
    /// Whether loading yields a collection.
    pub const fn is_collection(&self) -> bool {
        matches!(self, RelationKind::HasMany | RelationKind::ManyToMany(_))
    }
}

/// A declared relation between two record types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: CompactString,
    pub kind: RelationKind,
    /// Target record type name.
    pub target: CompactString,
    /// Foreign-key field. On the target for has-one/has-many, on the owner for
    /// belongs-to, unused for many-to-many.
    pub foreign_key: CompactString,
}

/// Fields stamped with the current time on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    /// Set on insert when not already set.
    pub created: CompactString,
    /// Set on every insert and update.
    pub updated: CompactString,
}

/// Table mapping of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: CompactString,
    table: CompactString,
    fields: Vec<FieldDef>,
    primary_key: CompactString,
    relations: Vec<RelationDef>,
    timestamps: Option<Timestamps>,
    soft_delete: Option<CompactString>,
}

impl RecordType {
    /// Starts a declaration. The primary key defaults to `id`.
    pub fn new(name: impl Into<CompactString>, table: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
            primary_key: CompactString::const_new("id"),
            relations: Vec::new(),
            timestamps: None,
            soft_delete: None,
        }
    }

    /// Declares a field stored in a column of the same name.
    pub fn field(self, name: impl Into<CompactString>) -> Self {
        let name = name.into();
        let column = name.clone();
        self.field_as(name, column)
    }

    /// Declares a field stored in a differently named column.
    pub fn field_as(
        mut self,
        name: impl Into<CompactString>,
        column: impl Into<CompactString>,
    ) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    pub fn primary_key(mut self, field: impl Into<CompactString>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Declares `created_at` and `updated_at`, stamped by `create` and `save`.
    pub fn timestamps(self) -> Self {
        self.timestamps_as("created_at", "updated_at")
    }

    /// Like [`timestamps`](Self::timestamps) with custom field names. Fields
    /// not declared yet are declared with a column of the same name.
    pub fn timestamps_as(
        mut self,
        created: impl Into<CompactString>,
        updated: impl Into<CompactString>,
    ) -> Self {
        let created = created.into();
        let updated = updated.into();
        for field in [&created, &updated] {
            if self.field_def(field).is_none() {
                self = self.field(field.clone());
            }
        }
        self.timestamps = Some(Timestamps { created, updated });
        self
    }

    /// Marks rows as deleted by stamping `field` instead of removing them.
    ///
    /// Reads skip rows where `field` is not NULL unless the query is
    /// [`unscoped`](crate::Query::unscoped).
    pub fn soft_delete(mut self, field: impl Into<CompactString>) -> Self {
        let field = field.into();
        if self.field_def(&field).is_none() {
            self = self.field(field.clone());
        }
        self.soft_delete = Some(field);
        self
    }

    pub fn has_one(
        self,
        name: impl Into<CompactString>,
        target: impl Into<CompactString>,
        foreign_key: impl Into<CompactString>,
    ) -> Self {
        self.relation(name, RelationKind::HasOne, target, foreign_key)
    }

    pub fn has_many(
        self,
        name: impl Into<CompactString>,
        target: impl Into<CompactString>,
        foreign_key: impl Into<CompactString>,
    ) -> Self {
        self.relation(name, RelationKind::HasMany, target, foreign_key)
    }

    pub fn belongs_to(
        self,
        name: impl Into<CompactString>,
        target: impl Into<CompactString>,
        foreign_key: impl Into<CompactString>,
    ) -> Self {
        self.relation(name, RelationKind::BelongsTo, target, foreign_key)
    }

    pub fn many_to_many(
        self,
        name: impl Into<CompactString>,
        target: impl Into<CompactString>,
        join: JoinTable,
    ) -> Self {
        self.relation(name, RelationKind::ManyToMany(join), target, "")
    }

    fn relation(
        mut self,
        name: impl Into<CompactString>,
        kind: RelationKind,
        target: impl Into<CompactString>,
        foreign_key: impl Into<CompactString>,
    ) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Primary key field name.
    pub fn primary_key_field(&self) -> &str {
        &self.primary_key
    }

    /// Primary key column name.
    pub fn primary_key_column(&self) -> &str {
        self.field_def(&self.primary_key)
            .map_or(self.primary_key.as_str(), |f| f.column.as_str())
    }

    /// Looks up a field by field name, falling back to column name.
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.column == name))
    }

    /// Like [`field_def`](Self::field_def) but fails with `UnknownField`.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef> {
        self.field_def(name)
            .ok_or_else(|| QuarryError::unknown_field(self.name.as_str(), name))
    }

    /// The field backed by `column`, exact column match only.
    pub fn field_for_column(&self, column: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn relation_def(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn timestamp_fields(&self) -> Option<&Timestamps> {
        self.timestamps.as_ref()
    }

    /// Column holding the deletion time, when soft delete is declared.
    pub fn soft_delete_column(&self) -> Option<&str> {
        let field = self.soft_delete.as_deref()?;
        Some(self.field_def(field).map_or(field, |f| f.column.as_str()))
    }

    pub fn soft_delete_field(&self) -> Option<&str> {
        self.soft_delete.as_deref()
    }

    fn validate(&self) -> Result<()> {
        let conflict = |msg: String| Err(QuarryError::SchemaConflict(msg));

        if self.field_def(&self.primary_key).is_none() {
            return conflict(format!(
                "primary key `{}` is not a declared field of `{}`",
                self.primary_key, self.name
            ));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return conflict(format!("duplicate field `{}` on `{}`", field.name, self.name));
            }
        }
        for (i, relation) in self.relations.iter().enumerate() {
            if self.relations[..i].iter().any(|r| r.name == relation.name) {
                return conflict(format!(
                    "duplicate relation `{}` on `{}`",
                    relation.name, self.name
                ));
            }
            if relation.kind == RelationKind::BelongsTo
                && self.field_def(&relation.foreign_key).is_none()
            {
                return conflict(format!(
                    "belongs-to relation `{}` uses undeclared foreign key `{}` on `{}`",
                    relation.name, relation.foreign_key, self.name
                ));
            }
        }
        Ok(())
    }
}

/// Read-only metadata for every registered record type.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<CompactString, RecordType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record type.
    ///
    /// Registering an identical definition twice is a no-op; a different
    /// definition under the same name fails with `SchemaConflict`.
    pub fn register(&mut self, record_type: RecordType) -> Result<()> {
        record_type.validate()?;
        match self.types.get(record_type.name()) {
            Some(existing) if *existing == record_type => Ok(()),
            Some(_) => Err(QuarryError::SchemaConflict(format!(
                "record type `{}` is already registered with a different definition",
                record_type.name()
            ))),
            None => {
                self.types.insert(record_type.name.clone(), record_type);
                Ok(())
            }
        }
    }

    pub fn describe(&self, name: &str) -> Result<&RecordType> {
        self.types
            .get(name)
            .ok_or_else(|| QuarryError::UnknownType(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}
