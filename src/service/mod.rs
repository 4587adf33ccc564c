//! # Service Layer
//!
//! Per-request context, the plugin chain that builds it, the registry of
//! named services, and the error taxonomy shared by all of them.

pub mod context;
pub mod errors;
pub mod plugin;
pub mod registry;
pub mod request;

pub use context::{AccessPolicy, AccessRequest, Context, Params, User};
pub use errors::{ErrorBody, ServiceError, ServiceResult};
pub use plugin::{ContextBuilder, Plugin, RequestHead, StoragePlugin};
pub use registry::{FaviconService, Service, ServiceOutput, ServiceRegistry};
pub use request::{RequestBody, ServiceRequest};
