//! # Request Dispatcher
//!
//! Turns one HTTP request into one response:
//!
//! 1. `OPTIONS` answers with the CORS preflight headers and nothing else
//! 2. a target ending in `/admin` redirects to `/admin/`
//! 3. the plugin chain builds the context
//! 4. the first path segment picks the service
//! 5. the service output becomes the body
//!
//! Every routed response carries `Access-Control-Allow-Origin: *` and a
//! JSON content type. Service errors become `{"code", "message"}` bodies.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE, HOST, LOCATION,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;

use crate::auth::{AccessPlugin, SessionPlugin};
use crate::crud::CollectionService;
use crate::observability::EventSink;
use crate::service::{
    ContextBuilder, ErrorBody, FaviconService, RequestBody, RequestHead, ServiceError,
    ServiceOutput, ServiceRegistry, ServiceRequest, ServiceResult, StoragePlugin,
};
use crate::storage::Storage;

use super::request::RequestTarget;

/// Service name of the generic collection API
pub const DATA_SERVICE: &str = "data";

/// Service name answering browser icon requests
pub const FAVICON_SERVICE: &str = "favicon.ico";

const JSON_CONTENT_TYPE: &str = "application/json";
const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str =
    "X-Requested-With, X-HTTP-Method-Override, Content-Type, Accept, X-Authorization";
const MAX_AGE: &str = "86400";
const ADMIN_SUFFIX: &str = "/admin";

/// Plugin chain plus service registry
#[derive(Clone)]
pub struct Dispatcher {
    plugins: ContextBuilder,
    services: ServiceRegistry,
}

impl Dispatcher {
    pub fn new(plugins: ContextBuilder, services: ServiceRegistry) -> Self {
        Self { plugins, services }
    }

    /// Storage, session and ownership plugins with the data and favicon services
    pub fn standard(
        storage: Arc<dyn Storage>,
        protected: Arc<dyn Storage>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let plugins = ContextBuilder::new()
            .with(StoragePlugin::new(storage).with_protected(protected))
            .with(SessionPlugin::new())
            .with(AccessPlugin::ownership());
        let services = ServiceRegistry::new()
            .register(DATA_SERVICE, CollectionService::new(sink))
            .register(FAVICON_SERVICE, FaviconService);
        Self::new(plugins, services)
    }

    /// Answer one fully buffered request
    pub async fn dispatch(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        tracing::info!("<< {} {}", method, uri);

        if method == Method::OPTIONS {
            let mut response = respond(StatusCode::OK, JSON_CONTENT_TYPE, Vec::new());
            let headers = response.headers_mut();
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("false"));
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
            return response;
        }

        if let Some(location) = admin_redirect(&uri, &headers) {
            return redirect(location);
        }

        let head = RequestHead::new(method, uri, headers);
        match self.handle(&head, &body).await {
            Ok(output) => render(output),
            Err(err) => self.render_error(&head, &err),
        }
    }

    async fn handle(&self, head: &RequestHead, body: &[u8]) -> ServiceResult<ServiceOutput> {
        let mut ctx = self.plugins.build(head).await?;

        let target = RequestTarget::parse(&head.uri);
        let Some(service) = self.services.resolve(&target.service) else {
            tracing::error!(request_id = %ctx.request_id, "Missing service {}", target.service);
            return Err(ServiceError::request(format!(
                "Service \"{}\" is not supported",
                target.service
            )));
        };

        let request = ServiceRequest::new(head.method.clone(), target.tokens)
            .with_query(target.query)
            .with_body(RequestBody::parse(body));
        service.call(&mut ctx, request).await
    }

    fn render_error(&self, head: &RequestHead, err: &ServiceError) -> Response {
        if err.is_internal() {
            tracing::error!(
                method = %head.method,
                uri = %head.uri,
                error = %err,
                "unhandled service failure"
            );
        } else {
            tracing::debug!(status = err.code(), error = %err, "request rejected");
        }
        let body = ErrorBody::from(err);
        match serde_json::to_vec(&body) {
            Ok(bytes) => respond(err.status_code(), JSON_CONTENT_TYPE, bytes),
            Err(_) => respond(err.status_code(), JSON_CONTENT_TYPE, Vec::new()),
        }
    }
}

fn render(output: ServiceOutput) -> Response {
    match output {
        ServiceOutput::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => respond(StatusCode::OK, JSON_CONTENT_TYPE, bytes),
            Err(err) => {
                tracing::error!(error = %err, "response serialization failed");
                let body = ErrorBody::from(&ServiceError::internal(err.to_string()));
                let bytes = serde_json::to_vec(&body).unwrap_or_default();
                respond(StatusCode::INTERNAL_SERVER_ERROR, JSON_CONTENT_TYPE, bytes)
            }
        },
        ServiceOutput::Empty => respond(StatusCode::OK, JSON_CONTENT_TYPE, Vec::new()),
        ServiceOutput::Raw { content_type, body } => respond(StatusCode::OK, content_type, body),
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Location for a target ending exactly in `/admin`
fn admin_redirect(uri: &Uri, headers: &HeaderMap) -> Option<HeaderValue> {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    if !target.ends_with(ADMIN_SUFFIX) {
        return None;
    }
    let path = format!("{}/", uri.path());
    let location = match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, path),
        None => path.clone(),
    };
    HeaderValue::from_str(&location)
        .or_else(|_| HeaderValue::from_str(&path))
        .ok()
}

fn redirect(location: HeaderValue) -> Response {
    let mut response = respond(StatusCode::FOUND, JSON_CONTENT_TYPE, Vec::new());
    response.headers_mut().insert(LOCATION, location);
    response
}
