//! # quarry
//!
//! A small relational data-access layer: record types declared at startup,
//! composable query descriptors, eager loading of relations and
//! find-or-create helpers.
//!
//! ## Quick Start
//!
//! ```rust
//! use quarry::prelude::*;
//! use quarry::sqlite::RusqliteBackend;
//!
//! # fn main() -> quarry::Result<()> {
//! let mut db = Quarry::new(RusqliteBackend::open_in_memory()?);
//! db.register(
//!     RecordType::new("User", "users")
//!         .field("id")
//!         .field("user_name")
//!         .field("first_name"),
//! )?;
//!
//! db.exec("create table users (id integer primary key, user_name text, first_name text)")?;
//! db.create(Record::new("User").set("user_name", "adent").set("first_name", "Arthur"))?;
//! db.create(Record::new("User").set("user_name", "fprefect").set("first_name", "Ford"))?;
//!
//! let users = db.find(
//!     Query::model("User")
//!         .r#where(raw!("user_name = ?", "adent"))
//!         .or([("user_name", "fprefect")]),
//! )?;
//! assert_eq!(users.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! | Database | Driver   | Feature Flag |
//! |----------|----------|--------------|
//! | SQLite   | rusqlite | `rusqlite`   |
//!
//! Other engines plug in by implementing [`Backend`].

pub use quarry_core::*;

/// SQLite backend over rusqlite.
#[cfg(feature = "rusqlite")]
pub mod sqlite {
    pub use quarry_sqlite::*;
}

pub mod prelude {
    pub use quarry_core::raw;
    pub use quarry_core::{
        Backend, Config, Cursor, Fields, JoinTable, Query, Quarry, QuarryError, Record,
        RecordType, Related, Result, Row, Value,
    };
}
