//! Error types for tablemap

use thiserror::Error;

/// Result type alias for tablemap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping and database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// A field's type is not one of the six scalar kinds the mapper supports
    #[error("Unsupported field kind on {}: {type_name}", field_location(entity, field))]
    UnsupportedFieldKind {
        entity: String,
        field: String,
        type_name: String,
    },

    /// A primary-key operation was requested on an entity without a pk field
    #[error("No primary key declared on {0}")]
    NoPrimaryKey(String),

    /// More than one field is tagged as the primary key
    #[error("Ambiguous primary key on {entity}: {}", fields.join(", "))]
    AmbiguousPrimaryKey { entity: String, fields: Vec<String> },

    /// Result columns that do not resolve to any destination field
    #[error("Columns not found on {table}: {}", columns.join(", "))]
    MissingColumn { table: String, columns: Vec<String> },

    /// An option was used where a different option kind is required
    #[error("Mismatched option kind: expected {expected}, found {found}")]
    MismatchedOptionKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Database connection error (statement preparation)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error
    #[error("Execution error: {0}")]
    Execution(String),

    /// Column value could not be read into the target kind
    #[error("Scan error on column '{column}': {message}")]
    Scan { column: String, message: String },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

fn field_location(entity: &str, field: &str) -> String {
    match (entity.is_empty(), field.is_empty()) {
        (false, false) => format!("{entity}.{field}"),
        (true, false) => field.to_string(),
        (false, true) => entity.to_string(),
        (true, true) => "an unnamed field".to_string(),
    }
}

impl OrmError {
    /// Create a scan error for a specific column
    pub fn scan(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Fill in the entity and field of an `UnsupportedFieldKind` raised by
    /// the field codec, which does not know where the value came from.
    pub fn at_field(self, entity: &str, field: &str) -> Self {
        match self {
            Self::UnsupportedFieldKind {
                entity: e,
                field: f,
                type_name,
            } => Self::UnsupportedFieldKind {
                entity: if e.is_empty() { entity.to_string() } else { e },
                field: if f.is_empty() { field.to_string() } else { f },
                type_name,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_no_primary_key(&self) -> bool {
        matches!(self, Self::NoPrimaryKey(_))
    }

    pub fn is_unsupported_field_kind(&self) -> bool {
        matches!(self, Self::UnsupportedFieldKind { .. })
    }

    /// Check whether this error originated in the mapping layer rather than the driver
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFieldKind { .. }
                | Self::NoPrimaryKey(_)
                | Self::AmbiguousPrimaryKey { .. }
                | Self::MissingColumn { .. }
                | Self::MismatchedOptionKind { .. }
        )
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Execution(err.to_string())
    }
}
