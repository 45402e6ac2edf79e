pub mod backend;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
mod persist;
pub mod query;
pub mod record;
mod relation;
mod retrieval;
pub mod row;
pub mod schema;
pub mod sql;
mod tracing;
pub mod value;

#[cfg(feature = "tracing")]
#[doc(hidden)]
pub use ::tracing as __tracing;

// Re-export key types and traits
pub use backend::{Backend, BufferedCursor, Cursor, ExecResult};
pub use config::Config;
pub use dialect::Dialect;
pub use error::{QuarryError, Result};
pub use executor::Quarry;
pub use query::{Condition, Filter, Query, Selection};
pub use record::{Fields, Record, Related};
pub use row::{FromRow, Row, RowSet};
pub use schema::{
    FieldDef, JoinTable, RecordType, Registry, RelationDef, RelationKind, Timestamps,
};
pub use sql::{Fragment, Statement};
pub use value::{FromValue, Key, Value};
