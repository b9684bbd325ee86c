//! Error types for querykit

use thiserror::Error;

/// Result type alias for statement building.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling a query AST or a DDL/DML statement.
///
/// All of these are programmer or configuration errors detected at build time.
/// A failed build never returns partial SQL.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The dialect deliberately does not implement the requested statement.
    #[error("{operation} is not supported by the {dialect} dialect")]
    UnsupportedOperation {
        operation: String,
        dialect: String,
    },

    /// Malformed condition or expression input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No builder is registered for a custom expression kind (nor for any of its ancestors).
    #[error("No expression builder registered for kind '{kind}'")]
    UnsupportedExpression { kind: String },

    /// A join entry without a join type or without a target table.
    #[error("Malformed join: {0}")]
    MalformedJoin(String),

    /// `INSERT ... SELECT` whose sub-query does not enumerate its columns.
    #[error("Insert into '{table}' expects a select query with enumerated (named) columns")]
    AmbiguousInsertSource { table: String },

    /// Dialect configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an unsupported operation error for a dialect.
    pub fn unsupported(operation: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            dialect: dialect.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is an unsupported operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    /// Check if this error stems from malformed input.
    ///
    /// Unsupported expressions, malformed joins and ambiguous insert sources
    /// are refinements of invalid arguments and are included.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::UnsupportedExpression { .. }
                | Self::MalformedJoin(_)
                | Self::AmbiguousInsertSource { .. }
        )
    }
}
