//! # CRUD Engine
//!
//! Verb handlers over a collection and the service that routes requests
//! to them.

pub mod handlers;
pub mod service;

pub use handlers::CrudHandlers;
pub use service::CollectionService;
