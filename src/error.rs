//! Error taxonomy for descriptor derivation, filter construction and
//! statement execution.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = OrmError> = std::result::Result<T, E>;

/// Every failure a facade operation can surface.
///
/// The core never retries and never falls back silently: a failed statement
/// is reported as `Execution` with the driver's error attached.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The entity type cannot be mapped to a table.
    #[error("cannot describe entity {entity}: {reason}")]
    Schema { entity: String, reason: String },

    /// Operator and operand do not fit together, or the filter does not
    /// apply to the queried entity.
    #[error("invalid filter on column '{column}': {reason}")]
    InvalidFilter { column: String, reason: String },

    /// Operator name outside the supported set.
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// Update or fetch on an instance whose primary key is not set.
    #[error("instance of '{table}' has no primary key value")]
    MissingIdentity { table: String },

    /// No row carries the requested primary key.
    #[error("no row in '{table}' with id {id}")]
    NotFound { table: String, id: i64 },

    /// The insert ran but the connection reported no generated identity.
    #[error("insert into '{table}' did not return a generated id")]
    IdentityUnavailable { table: String },

    /// The entity does not declare the requested field.
    #[error("entity {entity} has no field '{field}'")]
    UnknownField { entity: &'static str, field: String },

    /// A column value could not be converted into the field's type.
    #[error("cannot assign field '{field}': {source}")]
    Mapping {
        field: String,
        #[source]
        source: TypeMismatch,
    },

    /// The underlying connection reported a failure.
    #[error("statement execution failed: {0}")]
    Execution(#[from] sqlx::Error),
}

impl OrmError {
    pub(crate) fn schema(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_filter(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// A stored value whose kind does not match what the field expects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct TypeMismatch {
    pub expected: &'static str,
    pub found: String,
}
