//! docrest - REST collections over a pluggable document store
//!
//! Requests of the form `/<service>/<collection>[/<id>]?<options>` are
//! routed through an ordered plugin chain into CRUD verb handlers. Reads
//! pass through a fixed result pipeline: filter, sort, paginate, distinct,
//! count, select and relation loading.

pub mod auth;
pub mod cli;
pub mod crud;
pub mod http_server;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod service;
pub mod storage;
