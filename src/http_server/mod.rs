//! # HTTP Server Module
//!
//! axum front end for the service layer.
//!
//! - `request` splits the URI into service name, tokens and query options
//! - `dispatcher` runs plugins and services and renders responses
//! - `server` mounts the dispatcher as the router fallback

pub mod config;
pub mod dispatcher;
pub mod request;
pub mod server;

pub use config::ServerConfig;
pub use dispatcher::{Dispatcher, DATA_SERVICE, FAVICON_SERVICE};
pub use request::{parse_query, RequestTarget};
pub use server::{build_router, HttpServer};
