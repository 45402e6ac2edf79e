use thiserror::Error;

/// Boxed error coming out of a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum QuarryError {
    /// The record type was never registered
    #[error("Unknown record type: {0}")]
    UnknownType(String),

    /// A registration clashes with an existing or malformed definition
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// A preload path segment names no relation on the owner type
    #[error("Unknown relation `{relation}` on record type `{record}`")]
    UnknownRelation { record: String, relation: String },

    /// A field or column name matches nothing on the record type
    #[error("Unknown field `{field}` on record type `{record}`")]
    UnknownField { record: String, field: String },

    /// GROUP BY / HAVING without an aggregate projection
    #[error("Invalid aggregate: {0}")]
    InvalidAggregate(String),

    /// No rows returned when at least one was expected
    #[error("No rows found")]
    NotFound,

    /// Malformed raw fragment (placeholder/parameter mismatch)
    #[error("Statement error: {0}")]
    Statement(String),

    /// Error mapping row data onto records or caller types
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any failure reported by the storage backend
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),
}

impl QuarryError {
    /// Wraps a backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Backend(err.into())
    }

    pub fn unknown_relation(record: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            record: record.into(),
            relation: relation.into(),
        }
    }

    pub fn unknown_field(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            record: record.into(),
            field: field.into(),
        }
    }

    /// `true` for the expected "nothing matched" outcome of `first`/`last`/`take`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Mapping(err.to_string())
    }
}

/// Result type for quarry operations
pub type Result<T> = std::result::Result<T, QuarryError>;
