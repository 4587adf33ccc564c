//! Session Authentication
//!
//! Resolves the `X-Authorization` header to a user through the protected
//! storage. Requests without the header stay anonymous.

use async_trait::async_trait;
use serde_json::Value;

use crate::service::{Context, Plugin, RequestHead, ServiceError, ServiceResult, User};
use crate::storage::Storage;

/// Header carrying the access token
pub const AUTH_HEADER: &str = "x-authorization";

/// Protected collection mapping tokens to users
pub const SESSIONS_COLLECTION: &str = "sessions";

/// Protected collection holding user records
pub const USERS_COLLECTION: &str = "users";

const TOKEN_FIELD: &str = "accessToken";
const USER_FIELD: &str = "userId";
const INVALID_TOKEN: &str = "Invalid access token";

/// Attaches the caller to the context
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionPlugin;

impl SessionPlugin {
    pub fn new() -> Self {
        Self
    }

    async fn resolve(&self, protected: &dyn Storage, token: &str) -> ServiceResult<User> {
        let invalid = || ServiceError::forbidden(INVALID_TOKEN);

        let sessions = protected
            .get_all(SESSIONS_COLLECTION)
            .await
            .map_err(|_| invalid())?;
        let user_id = sessions
            .iter()
            .find(|s| s.get(TOKEN_FIELD).and_then(Value::as_str) == Some(token))
            .and_then(|s| s.get(USER_FIELD).and_then(Value::as_str))
            .ok_or_else(invalid)?;

        let record = protected
            .get(USERS_COLLECTION, user_id)
            .await
            .map_err(|_| invalid())?;
        User::from_record(record).ok_or_else(invalid)
    }
}

#[async_trait]
impl Plugin for SessionPlugin {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn decorate(&self, ctx: &mut Context, head: &RequestHead) -> ServiceResult<()> {
        let Some(token) = head.header(AUTH_HEADER).filter(|t| !t.is_empty()) else {
            return Ok(());
        };
        let protected = ctx
            .protected_storage()
            .ok_or_else(|| ServiceError::forbidden(INVALID_TOKEN))?;

        let user = self.resolve(protected, token).await?;
        tracing::debug!(request_id = %ctx.request_id, user = %user.id, "session resolved");
        ctx.user = Some(user);
        Ok(())
    }
}
