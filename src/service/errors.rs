//! # Service Errors
//!
//! Every failure a service, plugin or verb handler reports. Each variant
//! maps to an HTTP status and an error body `{"code", "message"}`.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::query::QueryError;
use crate::storage::StorageError;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed request
    #[error("{0}")]
    Request(String),

    /// Missing credentials
    #[error("{0}")]
    Credential(String),

    /// Access denied
    #[error("{0}")]
    Forbidden(String),

    /// Collection or record is missing
    #[error("{0}")]
    NotFound(String),

    /// Status and code chosen by the service
    #[error("{message}")]
    Custom {
        status: u16,
        code: u16,
        message: String,
    },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Unexpected fault; never shown to the caller
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound("Resource not found".to_string())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::Credential(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Custom { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code reported in the error body
    pub fn code(&self) -> u16 {
        match self {
            Self::Custom { code, .. } => *code,
            other => other.status_code().as_u16(),
        }
    }

    /// Whether this is an unanticipated fault
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<QueryError> for ServiceError {
    fn from(err: QueryError) -> Self {
        Self::Request(err.to_string())
    }
}

/// Read failures: "does not exist" is a 404, anything else a 400
impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DoesNotExist(_) => Self::NotFound(err.to_string()),
            StorageError::LockPoisoned => Self::Internal(err.to_string()),
            other => Self::Request(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Message shown for internal faults
pub const INTERNAL_MESSAGE: &str = "Server Error";

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        if err.is_internal() {
            return Self {
                code: 500,
                message: INTERNAL_MESSAGE.to_string(),
            };
        }
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
