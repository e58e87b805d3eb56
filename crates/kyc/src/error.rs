//! Error types for kyc

use thiserror::Error;

/// Result type alias for kyc operations
pub type KycResult<T> = Result<T, KycError>;

/// Error types for building and executing profile-graph statements
#[derive(Debug, Error)]
pub enum KycError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lookup expected to be singular matched several rows
    #[error("Expected {expected} row(s), got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Serialization failure; the whole transaction may be retried
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Failed to emit one item of a streamed list
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl KycError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether re-running the enclosing transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SerializationFailure(_))
    }

    /// Prefix the message with the operation that produced it.
    ///
    /// Only message-carrying variants are rewritten; the variant itself is kept so
    /// callers can still classify the error.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            Self::NotFound(m) => Self::NotFound(format!("{ctx}: {m}")),
            Self::Validation(m) => Self::Validation(format!("{ctx}: {m}")),
            Self::UniqueViolation(m) => Self::UniqueViolation(format!("{ctx}: {m}")),
            Self::ForeignKeyViolation(m) => Self::ForeignKeyViolation(format!("{ctx}: {m}")),
            Self::CheckViolation(m) => Self::CheckViolation(format!("{ctx}: {m}")),
            Self::Streaming(m) => Self::Streaming(format!("{ctx}: {m}")),
            Self::Decode { column, message } => Self::Decode {
                column,
                message: format!("{ctx}: {message}"),
            },
            Self::Query(e) => Self::Other(format!("{ctx}: {e}")),
            other => other,
        }
    }

    /// Parse a tokio_postgres error into a more specific KycError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                "40001" => return Self::SerializationFailure(message.to_string()),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for KycError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
