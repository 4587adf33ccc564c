//! Service registry
//!
//! Maps the first path segment of a request to the service handling it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::context::Context;
use super::errors::ServiceResult;
use super::request::ServiceRequest;

/// What a service produced
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceOutput {
    /// Serialized as the JSON response body
    Json(Value),
    /// Empty body
    Empty,
    /// Raw bytes with their own content type
    Raw {
        content_type: &'static str,
        body: Vec<u8>,
    },
}

/// Handler for one top-level path segment
#[async_trait]
pub trait Service: Send + Sync {
    async fn call(
        &self,
        ctx: &mut Context,
        request: ServiceRequest,
    ) -> ServiceResult<ServiceOutput>;
}

/// Named services
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a name, replacing any previous one
    pub fn register(mut self, name: impl Into<String>, service: impl Service + 'static) -> Self {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    /// Look up a service
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.services.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Serves an empty icon so browsers stop asking
pub struct FaviconService;

#[async_trait]
impl Service for FaviconService {
    async fn call(
        &self,
        _ctx: &mut Context,
        _request: ServiceRequest,
    ) -> ServiceResult<ServiceOutput> {
        Ok(ServiceOutput::Raw {
            content_type: "image/x-icon",
            body: Vec::new(),
        })
    }
}
