//! # CRUD Verb Handlers
//!
//! One handler per verb. Each checks the path tokens before any storage
//! call, then runs exactly one read and at most one write.

use std::sync::Arc;

use serde_json::Value;

use crate::observability::EventSink;
use crate::pipeline::{Payload, PreloadedRelations, QueryDescriptor, QueryMap, ResultPipeline};
use crate::service::{Context, RequestBody, ServiceError, ServiceResult};
use crate::storage::{StorageError, OWNER_FIELD};

/// Message for a path with too many segments
pub const BAD_REQUEST: &str = "Bad request";

/// Verb handlers over the context's storage
#[derive(Clone)]
pub struct CrudHandlers {
    sink: Arc<dyn EventSink>,
}

impl CrudHandlers {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// List collections, list records, or read one record
    pub async fn get(
        &self,
        ctx: &Context,
        tokens: &[String],
        query: &QueryMap,
    ) -> ServiceResult<Value> {
        validate_tokens(tokens)?;
        let storage = ctx.storage()?;

        let Some(collection) = ctx.params.collection.as_deref() else {
            let names = storage.collections().await?;
            let value = Value::from(names);
            ctx.can_access(Some(&value), None)?;
            return Ok(value);
        };

        let payload = match tokens.first() {
            Some(id) => Payload::Single(storage.get(collection, id).await?),
            None => Payload::List(storage.get_all(collection).await?),
        };

        let descriptor = QueryDescriptor::from_query(query);
        let pipeline = ResultPipeline::new(&descriptor, self.sink.as_ref());
        let relations = pipeline.relations();
        let preloaded = if relations.is_empty() {
            PreloadedRelations::new()
        } else {
            PreloadedRelations::fetch(&relations, storage, ctx.protected_storage()).await
        };

        let value = pipeline.run(payload, &relations, &preloaded)?.into_value();
        ctx.can_access(Some(&value), None)?;
        Ok(value)
    }

    /// Insert a record owned by the caller
    pub async fn post(
        &self,
        ctx: &Context,
        tokens: &[String],
        body: RequestBody,
    ) -> ServiceResult<Value> {
        validate_tokens(tokens)?;
        if !tokens.is_empty() {
            return Err(ServiceError::request("Use PUT to update records"));
        }
        let collection = target_collection(ctx)?;
        let mut record = body.into_record()?;
        let storage = ctx.storage()?;

        ctx.can_access(None, Some(&Value::Object(record.clone())))?;

        let user = ctx
            .user
            .as_ref()
            .ok_or_else(|| ServiceError::credential("Authentication required"))?;
        record.insert(OWNER_FIELD.to_string(), Value::String(user.id.clone()));

        let created = storage.add(collection, record).await.map_err(write_failure)?;
        self.sink
            .info("RECORD_CREATED", &[("collection", collection), ("owner", user.id.as_str())]);
        Ok(Value::Object(created))
    }

    /// Replace a record wholesale
    pub async fn put(
        &self,
        ctx: &Context,
        tokens: &[String],
        body: RequestBody,
    ) -> ServiceResult<Value> {
        let id = entry_id(tokens)?;
        let collection = target_collection(ctx)?;
        let record = body.into_record()?;
        let storage = ctx.storage()?;

        let existing = storage.get(collection, id).await?;
        ctx.can_access(
            Some(&Value::Object(existing)),
            Some(&Value::Object(record.clone())),
        )?;

        let replaced = storage.set(collection, id, record).await.map_err(write_failure)?;
        Ok(Value::Object(replaced))
    }

    /// Merge fields into a record
    pub async fn patch(
        &self,
        ctx: &Context,
        tokens: &[String],
        body: RequestBody,
    ) -> ServiceResult<Value> {
        let id = entry_id(tokens)?;
        let collection = target_collection(ctx)?;
        let partial = body.into_record()?;
        let storage = ctx.storage()?;

        let existing = storage.get(collection, id).await?;
        ctx.can_access(
            Some(&Value::Object(existing)),
            Some(&Value::Object(partial.clone())),
        )?;

        let merged = storage.merge(collection, id, partial).await.map_err(write_failure)?;
        Ok(Value::Object(merged))
    }

    /// Remove a record
    pub async fn delete(&self, ctx: &Context, tokens: &[String]) -> ServiceResult<Value> {
        let id = entry_id(tokens)?;
        let collection = target_collection(ctx)?;
        let storage = ctx.storage()?;

        let existing = storage.get(collection, id).await?;
        ctx.can_access(Some(&Value::Object(existing)), None)?;

        let receipt = storage.delete(collection, id).await.map_err(write_failure)?;
        self.sink
            .info("RECORD_DELETED", &[("collection", collection), ("id", id)]);
        Ok(receipt)
    }
}

/// At most one path token is accepted by any verb
fn validate_tokens(tokens: &[String]) -> ServiceResult<()> {
    if tokens.len() > 1 {
        return Err(ServiceError::request(BAD_REQUEST));
    }
    Ok(())
}

fn entry_id(tokens: &[String]) -> ServiceResult<&str> {
    validate_tokens(tokens)?;
    tokens
        .first()
        .map(String::as_str)
        .ok_or_else(|| ServiceError::request("Missing entry ID"))
}

fn target_collection(ctx: &Context) -> ServiceResult<&str> {
    ctx.params
        .collection
        .as_deref()
        .ok_or_else(|| ServiceError::request("Please, specify collection name"))
}

/// Write failures are client errors unless storage itself is broken
fn write_failure(err: StorageError) -> ServiceError {
    match err {
        StorageError::LockPoisoned => ServiceError::internal(err.to_string()),
        other => ServiceError::request(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use crate::service::{AccessPolicy, AccessRequest, User};
    use crate::storage::{MemoryStorage, Record, Storage};
    use axum::http::Method;
    use serde_json::json;
    use std::sync::Mutex;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn user(id: &str) -> User {
        User::from_record(record(json!({"_id": id, "email": format!("{id}@mail.com")}))).unwrap()
    }

    /// Records every check and denies when told to
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Option<Value>, Option<Value>)>>,
        deny: bool,
    }

    impl AccessPolicy for Recorder {
        fn check(&self, request: &AccessRequest<'_>) -> ServiceResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((request.existing.cloned(), request.body.cloned()));
            if self.deny {
                return Err(ServiceError::forbidden("denied"));
            }
            Ok(())
        }
    }

    async fn seeded() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        for (title, owner) in [("Alpha", "u1"), ("Beta", "u2"), ("Gamma", "u1")] {
            storage
                .add("books", record(json!({"title": title, "_ownerId": owner})))
                .await
                .unwrap();
        }
        storage
    }

    fn context(method: Method, storage: Arc<MemoryStorage>, collection: Option<&str>) -> Context {
        let mut ctx = Context::new(method);
        ctx.storage = Some(storage);
        ctx.params.collection = collection.map(str::to_string);
        ctx
    }

    fn handlers() -> CrudHandlers {
        CrudHandlers::new(Arc::new(MemorySink::new()))
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_lists_collection_names() {
        let ctx = context(Method::GET, seeded().await, None);
        let value = handlers().get(&ctx, &[], &QueryMap::new()).await.unwrap();
        assert_eq!(value, json!(["books"]));
    }

    #[tokio::test]
    async fn test_get_single_and_missing() {
        let storage = seeded().await;
        let first = storage.get_all("books").await.unwrap()[0].clone();
        let id = first["_id"].as_str().unwrap().to_string();
        let ctx = context(Method::GET, storage, Some("books"));

        let value = handlers().get(&ctx, &tokens(&[&id]), &QueryMap::new()).await.unwrap();
        assert_eq!(value["title"], "Alpha");

        let missing = handlers().get(&ctx, &tokens(&["nope"]), &QueryMap::new()).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_missing_collection_is_not_found() {
        let ctx = context(Method::GET, seeded().await, Some("movies"));
        let result = handlers().get(&ctx, &[], &QueryMap::new()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_rejects_extra_tokens_before_storage() {
        let ctx = Context::new(Method::GET);
        let result = handlers().get(&ctx, &tokens(&["a", "b"]), &QueryMap::new()).await;
        assert_eq!(result, Err(ServiceError::request(BAD_REQUEST)));
    }

    #[tokio::test]
    async fn test_get_applies_pipeline() {
        let ctx = context(Method::GET, seeded().await, Some("books"));
        let mut query = QueryMap::new();
        query.insert("where".into(), "_ownerId=\"u1\"".into());
        query.insert("sortBy".into(), "title desc".into());
        query.insert("select".into(), "title".into());

        let value = handlers().get(&ctx, &[], &query).await.unwrap();
        assert_eq!(value, json!([{"title": "Gamma"}, {"title": "Alpha"}]));

        query.insert("count".into(), "true".into());
        let value = handlers().get(&ctx, &[], &query).await.unwrap();
        assert_eq!(value, json!(2));
    }

    #[tokio::test]
    async fn test_get_bad_where_is_request_error() {
        let ctx = context(Method::GET, seeded().await, Some("books"));
        let mut query = QueryMap::new();
        query.insert("where".into(), "title".into());
        let result = handlers().get(&ctx, &[], &query).await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn test_post_forces_owner() {
        let storage = seeded().await;
        let mut ctx = context(Method::POST, Arc::clone(&storage), Some("books"));
        ctx.user = Some(user("u9"));

        let body = RequestBody::Json(json!({"title": "Delta", "_ownerId": "someone-else"}));
        let created = handlers().post(&ctx, &[], body).await.unwrap();
        assert_eq!(created["_ownerId"], "u9");

        let id = created["_id"].as_str().unwrap();
        let stored = storage.get("books", id).await.unwrap();
        assert_eq!(stored["_ownerId"], "u9");
    }

    #[tokio::test]
    async fn test_post_rejects_id_and_anonymous() {
        let mut ctx = context(Method::POST, seeded().await, Some("books"));
        let with_id = handlers()
            .post(&ctx, &tokens(&["x"]), RequestBody::Json(json!({})))
            .await;
        assert_eq!(with_id, Err(ServiceError::request("Use PUT to update records")));

        let anonymous = handlers().post(&ctx, &[], RequestBody::Json(json!({}))).await;
        assert!(matches!(anonymous, Err(ServiceError::Credential(_))));

        ctx.user = Some(user("u1"));
        let text = handlers()
            .post(&ctx, &[], RequestBody::Text("plain".into()))
            .await;
        assert!(matches!(text, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn test_post_runs_access_with_body() {
        let policy = Arc::new(Recorder::default());
        let mut ctx = context(Method::POST, seeded().await, Some("books"));
        ctx.user = Some(user("u1"));
        ctx.access = Some(policy.clone());

        handlers()
            .post(&ctx, &[], RequestBody::Json(json!({"title": "Delta"})))
            .await
            .unwrap();

        let calls = policy.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (None, Some(json!({"title": "Delta"}))));
    }

    #[tokio::test]
    async fn test_writes_require_entry_id() {
        let ctx = context(Method::PUT, seeded().await, Some("books"));
        let body = || RequestBody::Json(json!({}));
        let missing = Err(ServiceError::request("Missing entry ID"));

        assert_eq!(handlers().put(&ctx, &[], body()).await, missing);
        assert_eq!(handlers().patch(&ctx, &[], body()).await, missing);
        assert_eq!(handlers().delete(&ctx, &[]).await, missing);
        assert_eq!(
            handlers().delete(&ctx, &tokens(&["a", "b"])).await,
            Err(ServiceError::request(BAD_REQUEST))
        );
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found_before_access_check() {
        let policy = Arc::new(Recorder {
            deny: true,
            ..Default::default()
        });
        let mut ctx = context(Method::DELETE, seeded().await, Some("books"));
        ctx.access = Some(policy.clone());

        let result = handlers().delete(&ctx, &tokens(&["nope"])).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        let result = handlers()
            .put(&ctx, &tokens(&["nope"]), RequestBody::Json(json!({})))
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(policy.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_patch_delete() {
        let storage = seeded().await;
        let id = storage.get_all("books").await.unwrap()[1]["_id"]
            .as_str()
            .unwrap()
            .to_string();
        let policy = Arc::new(Recorder::default());
        let mut ctx = context(Method::PUT, Arc::clone(&storage), Some("books"));
        ctx.access = Some(policy.clone());
        let id_tokens = tokens(&[&id]);

        let replaced = handlers()
            .put(&ctx, &id_tokens, RequestBody::Json(json!({"name": "B"})))
            .await
            .unwrap();
        assert_eq!(replaced["name"], "B");
        assert!(replaced.get("title").is_none());
        assert_eq!(replaced["_ownerId"], "u2");

        let merged = handlers()
            .patch(&ctx, &id_tokens, RequestBody::Json(json!({"year": 2001})))
            .await
            .unwrap();
        assert_eq!(merged["name"], "B");
        assert_eq!(merged["year"], 2001);

        let receipt = handlers().delete(&ctx, &id_tokens).await.unwrap();
        assert!(receipt.get("_deletedOn").is_some());
        assert!(storage.get("books", &id).await.is_err());

        let calls = policy.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1, Some(json!({"name": "B"})));
        assert!(calls[2].1.is_none());
        assert_eq!(calls[2].0.as_ref().unwrap()["year"], 2001);
    }

    #[tokio::test]
    async fn test_denied_write_leaves_record() {
        let storage = seeded().await;
        let id = storage.get_all("books").await.unwrap()[0]["_id"]
            .as_str()
            .unwrap()
            .to_string();
        let mut ctx = context(Method::DELETE, Arc::clone(&storage), Some("books"));
        ctx.access = Some(Arc::new(Recorder {
            deny: true,
            ..Default::default()
        }));

        let result = handlers().delete(&ctx, &tokens(&[&id])).await;
        assert_eq!(result, Err(ServiceError::forbidden("denied")));
        assert!(storage.get("books", &id).await.is_ok());
    }
}
