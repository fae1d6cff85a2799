//! Error types for query compilation and parameter binding.

use thiserror::Error;

/// Result type for compiler operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling a descriptor or binding parameters.
///
/// Every variant describes a defect in caller input. Nothing here is
/// transient, so callers should not retry.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A required field is missing or has the wrong shape.
    #[error("{0}")]
    Validation(String),

    /// A relation key did not resolve in the catalog.
    #[error("Relation {0} is not defined")]
    RelationNotFound(String),

    /// An operator was given an operand of the wrong shape.
    #[error("Expected {expected} for '{operator}' operator")]
    MalformedOperator {
        operator: String,
        expected: &'static str,
    },

    /// An operator key is not part of the operator table.
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    /// A placeholder referenced a name absent from the supplied values.
    #[error("Missing value for parameter '{0}'")]
    MissingParameterValue(String),

    /// The binder was handed empty SQL text.
    #[error("Query text is empty")]
    EmptyQuery,

    /// Untyped JSON could not be read as a descriptor.
    #[error("Invalid query descriptor: {0}")]
    InvalidDescriptor(#[from] serde_json::Error),
}

impl QueryError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed-operator error.
    pub fn malformed(operator: impl Into<String>, expected: &'static str) -> Self {
        Self::MalformedOperator {
            operator: operator.into(),
            expected,
        }
    }

    /// Check if this error came from the parameter binder.
    pub fn is_binding_error(&self) -> bool {
        matches!(self, Self::MissingParameterValue(_) | Self::EmptyQuery)
    }
}
