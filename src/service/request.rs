//! Parsed service request

use axum::http::Method;
use serde_json::Value;

use crate::pipeline::QueryMap;
use crate::storage::Record;

use super::errors::{ServiceError, ServiceResult};

/// Buffered request body.
///
/// Bodies that are not valid JSON are kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

impl RequestBody {
    /// Decode a fully buffered body
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// The body as a record; anything but a JSON object is rejected
    pub fn into_record(self) -> ServiceResult<Record> {
        match self {
            Self::Json(Value::Object(record)) => Ok(record),
            _ => Err(ServiceError::request("Request body must be a JSON object")),
        }
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// What a service is invoked with
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    pub method: Method,
    /// Path segments after the service name
    pub tokens: Vec<String>,
    pub query: QueryMap,
    pub body: RequestBody,
}

impl ServiceRequest {
    pub fn new(method: Method, tokens: Vec<String>) -> Self {
        Self {
            method,
            tokens,
            query: QueryMap::new(),
            body: RequestBody::default(),
        }
    }

    pub fn with_query(mut self, query: QueryMap) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}
