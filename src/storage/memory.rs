//! In-memory reference storage engine
//!
//! Collections keep insertion order, both for collection names and for
//! the records inside each collection.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::{StorageError, StorageResult};
use super::seed::SeedData;
use super::{
    record_id, Record, Storage, CREATED_FIELD, ID_FIELD, SYSTEM_FIELDS, UPDATED_FIELD,
};

#[derive(Debug, Clone)]
struct Collection {
    name: String,
    records: Vec<Record>,
}

impl Collection {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| record_id(r) == Some(id))
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<Vec<Collection>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with seed data
    pub fn from_seed(seed: SeedData) -> Self {
        let collections = seed
            .into_collections()
            .into_iter()
            .map(|(name, records)| Collection { name, records })
            .collect();
        Self {
            data: RwLock::new(collections),
        }
    }

    fn now_ms() -> Value {
        Value::from(Utc::now().timestamp_millis())
    }

    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&Collection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let data = self.data.read().map_err(|_| StorageError::LockPoisoned)?;
        let target = data
            .iter()
            .find(|c| c.name == collection)
            .ok_or_else(StorageError::missing_collection)?;
        f(target)
    }

    fn with_collection_mut<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut data = self.data.write().map_err(|_| StorageError::LockPoisoned)?;
        let target = data
            .iter_mut()
            .find(|c| c.name == collection)
            .ok_or_else(StorageError::missing_collection)?;
        f(target)
    }
}

/// Copy system fields from `existing` over `target`
fn keep_system_fields(target: &mut Record, existing: &Record) {
    for field in SYSTEM_FIELDS {
        match existing.get(field) {
            Some(value) => {
                target.insert(field.to_string(), value.clone());
            }
            None => {
                target.remove(field);
            }
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn collections(&self) -> StorageResult<Vec<String>> {
        let data = self.data.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(data.iter().map(|c| c.name.clone()).collect())
    }

    async fn get_all(&self, collection: &str) -> StorageResult<Vec<Record>> {
        self.with_collection(collection, |c| Ok(c.records.clone()))
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Record> {
        self.with_collection(collection, |c| {
            c.position(id)
                .map(|idx| c.records[idx].clone())
                .ok_or_else(|| StorageError::missing_entry(id))
        })
    }

    async fn add(&self, collection: &str, mut record: Record) -> StorageResult<Record> {
        if collection.is_empty() {
            return Err(StorageError::InvalidRecord(
                "collection name is required".to_string(),
            ));
        }

        record.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        record.insert(CREATED_FIELD.to_string(), Self::now_ms());

        let mut data = self.data.write().map_err(|_| StorageError::LockPoisoned)?;
        match data.iter_mut().find(|c| c.name == collection) {
            Some(target) => target.records.push(record.clone()),
            None => data.push(Collection {
                name: collection.to_string(),
                records: vec![record.clone()],
            }),
        }

        Ok(record)
    }

    async fn set(&self, collection: &str, id: &str, record: Record) -> StorageResult<Record> {
        self.with_collection_mut(collection, |c| {
            let idx = c.position(id).ok_or_else(|| StorageError::missing_entry(id))?;

            let mut replacement = record;
            keep_system_fields(&mut replacement, &c.records[idx]);
            replacement.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            replacement.insert(UPDATED_FIELD.to_string(), Self::now_ms());

            c.records[idx] = replacement.clone();
            Ok(replacement)
        })
    }

    async fn merge(&self, collection: &str, id: &str, partial: Record) -> StorageResult<Record> {
        self.with_collection_mut(collection, |c| {
            let idx = c.position(id).ok_or_else(|| StorageError::missing_entry(id))?;

            let target = &mut c.records[idx];
            for (key, value) in partial {
                if !SYSTEM_FIELDS.contains(&key.as_str()) {
                    target.insert(key, value);
                }
            }
            target.insert(UPDATED_FIELD.to_string(), Self::now_ms());

            Ok(target.clone())
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<Value> {
        self.with_collection_mut(collection, |c| {
            let idx = c.position(id).ok_or_else(|| StorageError::missing_entry(id))?;
            c.records.remove(idx);
            Ok(json!({ "_deletedOn": Self::now_ms() }))
        })
    }
}
