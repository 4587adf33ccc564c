//! # Query Errors

use thiserror::Error;

/// Result type for query parsing and evaluation
pub type QueryResult<T> = Result<T, QueryError>;

/// WHERE clause failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Clause does not match the grammar
    #[error("Could not parse WHERE clause, check your syntax.")]
    Parse { clause: String, reason: String },

    /// Operator applied to a value it cannot handle
    #[error("Cannot evaluate \"{field}{operator}\": {reason}")]
    Evaluation {
        field: String,
        operator: String,
        reason: String,
    },
}

impl QueryError {
    pub fn parse(clause: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            clause: clause.into(),
            reason: reason.into(),
        }
    }

    pub fn evaluation(
        field: impl Into<String>,
        operator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Evaluation {
            field: field.into(),
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Detail not included in the user-facing message
    pub fn reason(&self) -> &str {
        match self {
            Self::Parse { reason, .. } | Self::Evaluation { reason, .. } => reason,
        }
    }
}
