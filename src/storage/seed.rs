//! Seed data loading
//!
//! Seed files are JSON objects keyed by collection name. Each collection is
//! either an object keyed by record id or an array of records:
//!
//! ```json
//! {
//!   "users": { "35c62d76": { "email": "peter@abv.bg" } },
//!   "recipes": [ { "name": "Easy Lasagna" } ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde_json::Value;
use uuid::Uuid;

use super::errors::{StorageError, StorageResult};
use super::{Record, ID_FIELD};

/// Parsed seed content, in file order
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    collections: Vec<(String, Vec<Record>)>,
}

impl SeedData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read and decode a seed file
    pub fn from_file(path: &Path) -> StorageResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StorageError::Seed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            StorageError::Seed(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        Self::from_value(value)
    }

    /// Decode seed content from a JSON value
    pub fn from_value(value: Value) -> StorageResult<Self> {
        let Value::Object(root) = value else {
            return Err(StorageError::Seed(
                "seed root must be an object of collections".to_string(),
            ));
        };

        let mut collections = Vec::with_capacity(root.len());
        for (name, entries) in root {
            let records = match entries {
                Value::Object(by_id) => by_id
                    .into_iter()
                    .map(|(id, entry)| into_record(&name, entry, Some(id)))
                    .collect::<StorageResult<Vec<_>>>()?,
                Value::Array(list) => list
                    .into_iter()
                    .map(|entry| into_record(&name, entry, None))
                    .collect::<StorageResult<Vec<_>>>()?,
                _ => {
                    return Err(StorageError::Seed(format!(
                        "collection \"{}\" must be an object or an array",
                        name
                    )))
                }
            };
            collections.push((name, records));
        }

        Ok(Self { collections })
    }

    /// Number of collections in the seed
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub(crate) fn into_collections(self) -> Vec<(String, Vec<Record>)> {
        self.collections
    }
}

fn into_record(collection: &str, entry: Value, key: Option<String>) -> StorageResult<Record> {
    let Value::Object(mut record) = entry else {
        return Err(StorageError::Seed(format!(
            "records in \"{}\" must be objects",
            collection
        )));
    };

    if !record.contains_key(ID_FIELD) {
        let id = key.unwrap_or_else(|| Uuid::new_v4().to_string());
        record.insert(ID_FIELD.to_string(), Value::String(id));
    }

    Ok(record)
}
