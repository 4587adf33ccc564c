//! # Storage Collaborator
//!
//! The record store that the CRUD engine runs against. The engine only
//! depends on the [`Storage`] trait; [`MemoryStorage`] is the reference
//! engine used by the server binary and the tests.
//!
//! ## Contract
//! - Every stored record carries a unique `_id` within its collection
//! - A missing collection or id is reported as [`StorageError::DoesNotExist`],
//!   distinct from every other failure
//! - Callers always receive copies; stored records are never handed out by reference

pub mod errors;
pub mod memory;
pub mod seed;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use seed::SeedData;

/// A schema-less document
pub type Record = Map<String, Value>;

/// Identity field present on every persisted record
pub const ID_FIELD: &str = "_id";

/// Owner identity field, set once at creation
pub const OWNER_FIELD: &str = "_ownerId";

/// Creation timestamp (ms since epoch)
pub const CREATED_FIELD: &str = "_createdOn";

/// Last update timestamp (ms since epoch)
pub const UPDATED_FIELD: &str = "_updatedOn";

/// Fields managed by the store that survive `set` and `merge`
pub const SYSTEM_FIELDS: [&str; 4] = [ID_FIELD, CREATED_FIELD, UPDATED_FIELD, OWNER_FIELD];

/// Per-collection CRUD store
#[async_trait]
pub trait Storage: Send + Sync {
    /// Names of all collections
    async fn collections(&self) -> StorageResult<Vec<String>>;

    /// All records of a collection, in insertion order
    async fn get_all(&self, collection: &str) -> StorageResult<Vec<Record>>;

    /// A single record by identity
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Record>;

    /// Insert a new record, creating the collection if needed
    async fn add(&self, collection: &str, record: Record) -> StorageResult<Record>;

    /// Replace an existing record wholesale
    async fn set(&self, collection: &str, id: &str, record: Record) -> StorageResult<Record>;

    /// Shallow-merge fields into an existing record
    async fn merge(&self, collection: &str, id: &str, partial: Record) -> StorageResult<Record>;

    /// Remove a record
    async fn delete(&self, collection: &str, id: &str) -> StorageResult<Value>;
}

/// Read the identity of a record as a string
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}
