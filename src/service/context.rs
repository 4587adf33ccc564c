//! Request Context
//!
//! A fresh context is built for every request by the plugin chain and
//! dropped when the request completes. It is never shared between requests.

use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::pipeline::relations::CREDENTIAL_FIELD;
use crate::storage::{record_id, Record, Storage};

use super::errors::{ServiceError, ServiceResult};

/// Route parameters resolved before the verb handler runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    /// Target collection
    pub collection: Option<String>,
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    /// User record without credential material
    pub record: Record,
}

impl User {
    /// Build from a stored user record; `None` if it has no string `_id`
    pub fn from_record(record: Record) -> Option<Self> {
        let id = record_id(&record)?.to_string();
        let record = record
            .into_iter()
            .filter(|(key, _)| key.as_str() != CREDENTIAL_FIELD)
            .collect();
        Some(Self { id, record })
    }

    /// Flagged with `"admin": true`
    pub fn is_admin(&self) -> bool {
        self.record.get("admin").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Arguments of one access check
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub method: &'a Method,
    pub collection: Option<&'a str>,
    pub user: Option<&'a User>,
    /// Stored record(s) involved, or the read payload
    pub existing: Option<&'a Value>,
    /// Submitted body for writes
    pub body: Option<&'a Value>,
}

/// Capability check; returning an error denies the request
pub trait AccessPolicy: Send + Sync {
    fn check(&self, request: &AccessRequest<'_>) -> ServiceResult<()>;
}

/// Per-request context
pub struct Context {
    /// Request ID for tracing
    pub request_id: Uuid,
    pub method: Method,
    pub params: Params,
    pub storage: Option<Arc<dyn Storage>>,
    pub protected_storage: Option<Arc<dyn Storage>>,
    pub user: Option<User>,
    pub access: Option<Arc<dyn AccessPolicy>>,
}

impl Context {
    /// An empty context for a request with the given method
    pub fn new(method: Method) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            method,
            params: Params::default(),
            storage: None,
            protected_storage: None,
            user: None,
            access: None,
        }
    }

    /// Ordinary storage; its absence is a wiring fault
    pub fn storage(&self) -> ServiceResult<&dyn Storage> {
        self.storage
            .as_deref()
            .ok_or_else(|| ServiceError::internal("storage plugin is not installed"))
    }

    /// Storage holding users and sessions
    pub fn protected_storage(&self) -> Option<&dyn Storage> {
        self.protected_storage.as_deref()
    }

    /// Run the installed access policy; no policy permits everything
    pub fn can_access(&self, existing: Option<&Value>, body: Option<&Value>) -> ServiceResult<()> {
        let Some(policy) = &self.access else {
            return Ok(());
        };
        policy.check(&AccessRequest {
            method: &self.method,
            collection: self.params.collection.as_deref(),
            user: self.user.as_ref(),
            existing,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct DenyAll;

    impl AccessPolicy for DenyAll {
        fn check(&self, _request: &AccessRequest<'_>) -> ServiceResult<()> {
            Err(ServiceError::forbidden("denied"))
        }
    }

    #[test]
    fn test_user_from_record_strips_credentials() {
        let record = match json!({"_id": "u1", "email": "a@b.c", "hashedPassword": "x"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let user = User::from_record(record).unwrap();
        assert_eq!(user.id, "u1");
        assert!(!user.record.contains_key(CREDENTIAL_FIELD));
        assert!(!user.is_admin());
    }

    #[test]
    fn test_context_without_policy_permits() {
        let ctx = Context::new(Method::GET);
        assert!(ctx.can_access(None, None).is_ok());
        assert!(ctx.storage().err().unwrap().is_internal());
    }

    #[test]
    fn test_context_runs_policy() {
        let mut ctx = Context::new(Method::DELETE);
        ctx.access = Some(Arc::new(DenyAll));
        assert_eq!(
            ctx.can_access(Some(&json!({})), None),
            Err(ServiceError::forbidden("denied"))
        );
    }
}
