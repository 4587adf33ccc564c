//! # Authentication and Access
//!
//! Session-token authentication and the ownership access policy, both
//! installed as context plugins.

pub mod rules;
pub mod session;

pub use rules::{AccessPlugin, OwnershipPolicy, ADMIN_FLAG};
pub use session::{SessionPlugin, AUTH_HEADER, SESSIONS_COLLECTION, USERS_COLLECTION};
