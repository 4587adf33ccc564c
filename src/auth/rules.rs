//! Ownership access policy
//!
//! Reads are open. Writes need a caller, and writes to an existing record
//! need the caller to own it. Admins bypass ownership.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::Value;

use crate::service::{
    AccessPolicy, AccessRequest, Context, Plugin, RequestHead, ServiceError, ServiceResult,
};
use crate::storage::OWNER_FIELD;

/// User field granting full access
pub const ADMIN_FLAG: &str = "admin";

/// Owner-only writes
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnershipPolicy;

impl OwnershipPolicy {
    pub fn new() -> Self {
        Self
    }

    fn is_read(method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

impl AccessPolicy for OwnershipPolicy {
    fn check(&self, request: &AccessRequest<'_>) -> ServiceResult<()> {
        if Self::is_read(request.method) {
            return Ok(());
        }

        let user = request
            .user
            .ok_or_else(|| ServiceError::credential("Authentication required"))?;
        if user.is_admin() {
            return Ok(());
        }

        let Some(existing) = request.existing else {
            return Ok(());
        };
        let owner = existing.get(OWNER_FIELD).and_then(Value::as_str);
        if owner != Some(user.id.as_str()) {
            return Err(ServiceError::forbidden("You are not the owner of this record"));
        }
        Ok(())
    }
}

/// Installs an access policy on every context
#[derive(Clone)]
pub struct AccessPlugin {
    policy: Arc<dyn AccessPolicy>,
}

impl AccessPlugin {
    pub fn new(policy: impl AccessPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// The ownership rules
    pub fn ownership() -> Self {
        Self::new(OwnershipPolicy)
    }
}

#[async_trait]
impl Plugin for AccessPlugin {
    fn name(&self) -> &'static str {
        "access"
    }

    async fn decorate(&self, ctx: &mut Context, _head: &RequestHead) -> ServiceResult<()> {
        ctx.access = Some(Arc::clone(&self.policy));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::User;
    use serde_json::json;

    fn user(value: Value) -> User {
        match value {
            Value::Object(map) => User::from_record(map).unwrap(),
            _ => panic!("fixture must be an object"),
        }
    }

    fn check(
        method: Method,
        user: Option<&User>,
        existing: Option<&Value>,
    ) -> ServiceResult<()> {
        OwnershipPolicy.check(&AccessRequest {
            method: &method,
            collection: Some("books"),
            user,
            existing,
            body: None,
        })
    }

    #[test]
    fn test_reads_are_open() {
        assert!(check(Method::GET, None, Some(&json!([{"_ownerId": "x"}]))).is_ok());
    }

    #[test]
    fn test_writes_need_a_user() {
        assert_eq!(
            check(Method::POST, None, None),
            Err(ServiceError::credential("Authentication required"))
        );
    }

    #[test]
    fn test_create_needs_no_owner() {
        let peter = user(json!({"_id": "u1"}));
        assert!(check(Method::POST, Some(&peter), None).is_ok());
    }

    #[test]
    fn test_owner_matches() {
        let peter = user(json!({"_id": "u1"}));
        let mine = json!({"_id": "r1", "_ownerId": "u1"});
        let theirs = json!({"_id": "r2", "_ownerId": "u2"});

        assert!(check(Method::PUT, Some(&peter), Some(&mine)).is_ok());
        assert!(matches!(
            check(Method::DELETE, Some(&peter), Some(&theirs)),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            check(Method::PATCH, Some(&peter), Some(&json!({"_id": "r3"}))),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_bypasses_ownership() {
        let admin = user(json!({"_id": "a1", "admin": true}));
        let theirs = json!({"_id": "r2", "_ownerId": "u2"});
        assert!(check(Method::DELETE, Some(&admin), Some(&theirs)).is_ok());
    }

    #[tokio::test]
    async fn test_plugin_installs_policy() {
        use axum::http::{HeaderMap, Uri};

        let mut ctx = Context::new(Method::DELETE);
        let head = RequestHead::new(
            Method::DELETE,
            Uri::from_static("/data/books/1"),
            HeaderMap::new(),
        );
        AccessPlugin::ownership().decorate(&mut ctx, &head).await.unwrap();

        assert!(matches!(
            ctx.can_access(Some(&json!({"_ownerId": "u2"})), None),
            Err(ServiceError::Credential(_))
        ));
    }
}
