//! Context plugins
//!
//! A plugin decorates the request context before dispatch. Plugins run in
//! registration order; the first failure rejects the request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, Uri};

use crate::storage::Storage;

use super::context::Context;
use super::errors::ServiceResult;

/// The parts of the raw request plugins may inspect
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Header value as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Pre-dispatch context decorator
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &'static str;

    /// Augment the context, or fail to reject the request
    async fn decorate(&self, ctx: &mut Context, head: &RequestHead) -> ServiceResult<()>;
}

/// Ordered plugin chain producing a fresh context per request
#[derive(Clone, Default)]
pub struct ContextBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin
    pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every plugin over a new context
    pub async fn build(&self, head: &RequestHead) -> ServiceResult<Context> {
        let mut ctx = Context::new(head.method.clone());
        for plugin in &self.plugins {
            if let Err(err) = plugin.decorate(&mut ctx, head).await {
                tracing::debug!(plugin = plugin.name(), error = %err, "plugin rejected request");
                return Err(err);
            }
        }
        Ok(ctx)
    }
}

/// Attaches the shared storages to every context
#[derive(Clone)]
pub struct StoragePlugin {
    storage: Arc<dyn Storage>,
    protected: Option<Arc<dyn Storage>>,
}

impl StoragePlugin {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            protected: None,
        }
    }

    /// Storage for users and sessions
    pub fn with_protected(mut self, protected: Arc<dyn Storage>) -> Self {
        self.protected = Some(protected);
        self
    }
}

#[async_trait]
impl Plugin for StoragePlugin {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn decorate(&self, ctx: &mut Context, _head: &RequestHead) -> ServiceResult<()> {
        ctx.storage = Some(Arc::clone(&self.storage));
        ctx.protected_storage = self.protected.clone();
        Ok(())
    }
}
