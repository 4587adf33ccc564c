//! Relation Loader
//!
//! `load=author=_ownerId:users` attaches, under `author`, the record of
//! `users` whose `_id` equals the record's `_ownerId`. The related
//! collection may name its join field: `prop=idField:collection@field`.
//!
//! Related collections are fetched up front into [`PreloadedRelations`],
//! so injection itself is a synchronous transformation over copies.

use std::collections::HashMap;

use serde_json::Value;

use crate::observability::EventSink;
use crate::query::value::strict_eq;
use crate::storage::{Record, Storage, StorageError, ID_FIELD};

/// Credential material never exposed through relations
pub const CREDENTIAL_FIELD: &str = "hashedPassword";

/// Collection resolved against the protected storage
pub const PROTECTED_COLLECTION: &str = "users";

/// `<prop>=<idField>:<collection>[@<relatedField>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Field the related record is attached under
    pub prop: String,
    /// Field of the record holding the foreign value
    pub id_field: String,
    /// Collection searched for the related record
    pub collection: String,
    /// Field of the related record matched against the foreign value
    pub related_field: String,
}

impl RelationSpec {
    /// Parse a single spec
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let mut assignment = raw.split('=');
        let prop = assignment.next().map(str::trim).unwrap_or_default();
        let target = assignment.next().ok_or("missing '='")?;

        let mut relation = target.split(':');
        let id_field = relation.next().map(str::trim).unwrap_or_default();
        let collection_part = relation.next().ok_or("missing ':'")?;

        let mut collection_tokens = collection_part.split('@');
        let collection = collection_tokens.next().map(str::trim).unwrap_or_default();
        let related_field = collection_tokens
            .next()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(ID_FIELD);

        if prop.is_empty() || id_field.is_empty() || collection.is_empty() {
            return Err("empty component");
        }

        Ok(Self {
            prop: prop.to_string(),
            id_field: id_field.to_string(),
            collection: collection.to_string(),
            related_field: related_field.to_string(),
        })
    }
}

/// Parse a comma-separated `load` descriptor, skipping malformed entries
pub fn parse_relations(raw: &str, sink: &dyn EventSink) -> Vec<RelationSpec> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| match RelationSpec::parse(entry) {
            Ok(spec) => Some(spec),
            Err(reason) => {
                sink.warn("RELATION_SKIPPED", &[("spec", entry), ("reason", reason)]);
                None
            }
        })
        .collect()
}

/// Where related records come from
pub trait RelationSource {
    /// All records of a related collection
    fn records(&self, collection: &str) -> Result<&[Record], String>;
}

/// Related collections fetched ahead of injection
#[derive(Debug, Default)]
pub struct PreloadedRelations {
    sets: HashMap<String, Result<Vec<Record>, String>>,
}

impl PreloadedRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outcome of fetching a collection
    pub fn insert(&mut self, collection: impl Into<String>, result: Result<Vec<Record>, String>) {
        self.sets.insert(collection.into(), result);
    }

    /// Fetch every collection the specs refer to.
    ///
    /// `users` resolves against `protected`, everything else against
    /// `storage`. Failures are kept per collection, not raised.
    pub async fn fetch(
        specs: &[RelationSpec],
        storage: &dyn Storage,
        protected: Option<&dyn Storage>,
    ) -> Self {
        let mut preloaded = Self::new();
        for spec in specs {
            if preloaded.sets.contains_key(&spec.collection) {
                continue;
            }
            let result = if spec.collection == PROTECTED_COLLECTION {
                match protected {
                    Some(protected) => protected.get_all(&spec.collection).await,
                    None => Err(StorageError::missing_collection()),
                }
            } else {
                storage.get_all(&spec.collection).await
            };
            preloaded.insert(spec.collection.clone(), result.map_err(|e| e.to_string()));
        }
        preloaded
    }
}

impl RelationSource for PreloadedRelations {
    fn records(&self, collection: &str) -> Result<&[Record], String> {
        match self.sets.get(collection) {
            Some(Ok(records)) => Ok(records),
            Some(Err(reason)) => Err(reason.clone()),
            None => Err(format!("collection \"{}\" was not loaded", collection)),
        }
    }
}

/// Injects related records into pipeline results
pub struct RelationLoader<'a> {
    source: &'a dyn RelationSource,
    sink: &'a dyn EventSink,
}

impl<'a> RelationLoader<'a> {
    pub fn new(source: &'a dyn RelationSource, sink: &'a dyn EventSink) -> Self {
        Self { source, sink }
    }

    /// Announce each relation once per request
    pub fn announce(&self, specs: &[RelationSpec]) {
        for spec in specs {
            self.sink.info(
                "RELATION_LOADING",
                &[
                    ("collection", spec.collection.as_str()),
                    ("prop", spec.prop.as_str()),
                    ("id_field", spec.id_field.as_str()),
                    ("related_field", spec.related_field.as_str()),
                ],
            );
        }
    }

    /// Apply every spec, in order, to one record
    pub fn load(&self, record: Record, specs: &[RelationSpec]) -> Record {
        specs
            .iter()
            .fold(record, |record, spec| self.inject(record, spec))
    }

    fn inject(&self, mut record: Record, spec: &RelationSpec) -> Record {
        let Some(seek) = record.get(&spec.id_field) else {
            return record;
        };

        let related = match self.source.records(&spec.collection) {
            Ok(records) => records
                .iter()
                .find(|r| r.get(&spec.related_field).is_some_and(|v| strict_eq(v, seek))),
            Err(reason) => {
                self.sink.warn(
                    "RELATION_FAILED",
                    &[("collection", spec.collection.as_str()), ("reason", reason.as_str())],
                );
                return record;
            }
        };

        if let Some(related) = related {
            let copy: Record = related
                .iter()
                .filter(|(key, _)| key.as_str() != CREDENTIAL_FIELD)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            record.insert(spec.prop.clone(), Value::Object(copy));
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn users() -> PreloadedRelations {
        let mut preloaded = PreloadedRelations::new();
        preloaded.insert(
            "users",
            Ok(vec![
                record(json!({"_id": "u1", "email": "ann@x.y", "hashedPassword": "secret"})),
                record(json!({"_id": "u2", "email": "bob@x.y", "username": "bob"})),
            ]),
        );
        preloaded
    }

    #[test]
    fn test_parse_spec() {
        let spec = RelationSpec::parse("author=authorId:users").unwrap();
        assert_eq!(spec.prop, "author");
        assert_eq!(spec.id_field, "authorId");
        assert_eq!(spec.collection, "users");
        assert_eq!(spec.related_field, "_id");

        let spec = RelationSpec::parse("owner=ownerName:users@username").unwrap();
        assert_eq!(spec.related_field, "username");
    }

    #[test]
    fn test_malformed_specs_are_skipped_with_warning() {
        let sink = MemorySink::new();
        let specs = parse_relations("author=authorId:users,broken,x=y,,=a:b", &sink);

        assert_eq!(specs.len(), 1);
        assert_eq!(sink.named("RELATION_SKIPPED").len(), 3);
    }

    #[test]
    fn test_injects_copy_without_credentials() {
        let sink = MemorySink::new();
        let source = users();
        let loader = RelationLoader::new(&source, &sink);
        let specs = parse_relations("author=authorId:users", &sink);

        let loaded = loader.load(record(json!({"_id": "p1", "authorId": "u1"})), &specs);

        assert_eq!(loaded["author"]["email"], "ann@x.y");
        assert!(loaded["author"].get(CREDENTIAL_FIELD).is_none());

        // the source keeps its credential field
        let stored = source.records("users").unwrap();
        assert_eq!(stored[0][CREDENTIAL_FIELD], "secret");
    }

    #[test]
    fn test_no_match_or_missing_field_leaves_record_unchanged() {
        let sink = MemorySink::new();
        let source = users();
        let loader = RelationLoader::new(&source, &sink);
        let specs = parse_relations("author=authorId:users", &sink);

        let unmatched = record(json!({"_id": "p1", "authorId": "nobody"}));
        assert_eq!(loader.load(unmatched.clone(), &specs), unmatched);

        let no_field = record(json!({"_id": "p2"}));
        assert_eq!(loader.load(no_field.clone(), &specs), no_field);
    }

    #[test]
    fn test_numeric_join_matches_by_value() {
        let sink = MemorySink::new();
        let mut source = PreloadedRelations::new();
        source.insert(
            "books",
            Ok(vec![record(json!({"_id": "b1", "bookId": 1.0, "title": "Dune"}))]),
        );
        let loader = RelationLoader::new(&source, &sink);
        let specs = parse_relations("book=ref:books@bookId", &sink);

        let loaded = loader.load(record(json!({"_id": "r1", "ref": 1})), &specs);
        assert_eq!(loaded["book"]["title"], "Dune");

        let unmatched = record(json!({"_id": "r2", "ref": "1"}));
        assert_eq!(loader.load(unmatched.clone(), &specs), unmatched);
    }

    #[test]
    fn test_failed_collection_degrades() {
        let sink = MemorySink::new();
        let mut source = users();
        source.insert("likes", Err("Collection does not exist".to_string()));
        let loader = RelationLoader::new(&source, &sink);
        let specs = parse_relations("author=authorId:users,like=_id:likes@postId", &sink);

        let loaded = loader.load(record(json!({"_id": "p1", "authorId": "u2"})), &specs);

        assert_eq!(loaded["author"]["username"], "bob");
        assert!(loaded.get("like").is_none());
        assert_eq!(sink.named("RELATION_FAILED").len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_routes_users_to_protected_storage() {
        let storage = MemoryStorage::new();
        let protected = MemoryStorage::new();
        protected
            .add("users", record(json!({"email": "ann@x.y"})))
            .await
            .unwrap();

        let sink = MemorySink::new();
        let specs = parse_relations("author=authorId:users,comment=_id:comments", &sink);
        let preloaded =
            PreloadedRelations::fetch(&specs, &storage, Some(&protected as &dyn Storage)).await;

        assert_eq!(preloaded.records("users").unwrap().len(), 1);
        assert!(preloaded.records("comments").is_err());
    }
}
