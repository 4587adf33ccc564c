//! # HTTP Server
//!
//! Routes every request through the dispatcher. There are no static routes:
//! the service registry owns the whole path space.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::config::ServerConfig;
use super::dispatcher::Dispatcher;

/// HTTP server bound to one dispatcher
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let router = build_router(Arc::new(dispatcher));
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process stops
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr.as_str()).await?;
        tracing::info!("Server started on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Router sending every request to `dispatcher`
pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(dispatcher)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn handle(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatcher.dispatch(method, uri, headers, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use crate::storage::MemoryStorage;

    fn server(port: u16) -> HttpServer {
        let dispatcher = Dispatcher::standard(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
            Arc::new(MemorySink::new()),
        );
        HttpServer::new(ServerConfig::with_port(port), dispatcher)
    }

    #[test]
    fn test_server_with_custom_port() {
        assert_eq!(server(8080).socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds() {
        let _router = server(3030).router();
    }
}
