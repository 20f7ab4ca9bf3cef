//! Error types for pgrepo

use thiserror::Error;

/// Result alias used by every repository operation.
pub type OrmResult<T> = Result<T, OrmError>;

/// Everything a repository call can fail with.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The database could not be reached or the connection settings are unusable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected or failed a statement.
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A statement expected to return a row returned none.
    #[error("Not found: {0}")]
    NotFound(String),

    /// SQLSTATE 23505.
    #[error("Unique constraint '{constraint}' violated: {message}")]
    UniqueViolation { constraint: String, message: String },

    /// SQLSTATE 23503.
    #[error("Foreign key '{constraint}' violated: {message}")]
    ForeignKeyViolation { constraint: String, message: String },

    /// SQLSTATE 23514.
    #[error("Check constraint '{constraint}' violated: {message}")]
    CheckViolation { constraint: String, message: String },

    /// A column could not be read into the requested type.
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A request that can never produce a valid statement.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A statement that needs at least one condition was given none.
    #[error("Empty clause: {0}")]
    EmptyClause(String),

    /// A pagination cursor that does not encode a non-negative offset.
    #[error("Invalid cursor '{cursor}': {message}")]
    InvalidCursor { cursor: String, message: String },

    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    #[error("{0}")]
    Other(String),
}

impl OrmError {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_cursor(cursor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCursor {
            cursor: cursor.into(),
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Unique, foreign key or check constraint failure.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation { .. }
                | Self::ForeignKeyViolation { .. }
                | Self::CheckViolation { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn is_invalid_cursor(&self) -> bool {
        matches!(self, Self::InvalidCursor { .. })
    }

    /// Map a driver error, promoting constraint SQLSTATEs to their own variants.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        let violation = err.as_db_error().and_then(|db| {
            constraint_violation(
                db.code().code(),
                db.constraint().unwrap_or("unknown"),
                db.message(),
            )
        });
        violation.unwrap_or(Self::Query(err))
    }
}

fn constraint_violation(sqlstate: &str, constraint: &str, message: &str) -> Option<OrmError> {
    let constraint = constraint.to_string();
    let message = message.to_string();
    match sqlstate {
        "23505" => Some(OrmError::UniqueViolation {
            constraint,
            message,
        }),
        "23503" => Some(OrmError::ForeignKeyViolation {
            constraint,
            message,
        }),
        "23514" => Some(OrmError::CheckViolation {
            constraint,
            message,
        }),
        _ => None,
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
