//! Generic collection service

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;

use crate::observability::EventSink;
use crate::service::{Context, Service, ServiceError, ServiceOutput, ServiceRequest, ServiceResult};

use super::handlers::CrudHandlers;

/// Routes `/<name>/<collection>[/<id>]` to the verb handlers
pub struct CollectionService {
    handlers: CrudHandlers,
}

impl CollectionService {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            handlers: CrudHandlers::new(sink),
        }
    }
}

#[async_trait]
impl Service for CollectionService {
    async fn call(
        &self,
        ctx: &mut Context,
        request: ServiceRequest,
    ) -> ServiceResult<ServiceOutput> {
        let mut tokens = request.tokens.into_iter();
        ctx.params.collection = tokens.next();
        let tokens: Vec<String> = tokens.collect();
        let ctx = &*ctx;

        let value = match request.method {
            Method::GET => self.handlers.get(ctx, &tokens, &request.query).await?,
            Method::POST => self.handlers.post(ctx, &tokens, request.body).await?,
            Method::PUT => self.handlers.put(ctx, &tokens, request.body).await?,
            Method::PATCH => self.handlers.patch(ctx, &tokens, request.body).await?,
            Method::DELETE => self.handlers.delete(ctx, &tokens).await?,
            other => {
                return Err(ServiceError::Custom {
                    status: 405,
                    code: 405,
                    message: format!("Method {other} is not supported"),
                })
            }
        };
        Ok(ServiceOutput::Json(value))
    }
}
