//! Document store: whole parent documents (users, jobs) persisted as JSON.
//!
//! The store only knows collections, ids and JSON values. Typed access goes
//! through the `ParentDocument` helpers at the bottom of this module.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Jobs,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Jobs => "jobs",
        }
    }

    /// Singular label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Jobs => "Job",
        }
    }
}

/// Closure applied to a document under the store's per-document lock.
/// Returning an error aborts the write and leaves the stored document untouched.
pub type Mutation<'a> = Box<dyn FnOnce(Value) -> Result<Value, AppError> + Send + 'a>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), AppError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError>;

    /// Atomic read-modify-write of one document. Fails with NotFound if absent.
    async fn update<'a>(
        &'a self,
        collection: Collection,
        id: Uuid,
        mutation: Mutation<'a>,
    ) -> Result<Value, AppError>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError>;

    /// All documents containing `probe` (JSON containment), newest first.
    async fn find_containing(
        &self,
        collection: Collection,
        probe: Value,
    ) -> Result<Vec<Value>, AppError>;

    async fn find_one_containing(
        &self,
        collection: Collection,
        probe: Value,
    ) -> Result<Option<Value>, AppError> {
        Ok(self
            .find_containing(collection, probe)
            .await?
            .into_iter()
            .next())
    }
}

/// JSON containment with Postgres `@>` semantics: objects match when every
/// probe key is contained, arrays when every probe element is contained by
/// some document element, scalars when equal.
pub fn json_contains(doc: &Value, probe: &Value) -> bool {
    match (doc, probe) {
        (Value::Object(d), Value::Object(p)) => p
            .iter()
            .all(|(k, pv)| d.get(k).is_some_and(|dv| json_contains(dv, pv))),
        (Value::Array(d), Value::Array(p)) => {
            p.iter().all(|pv| d.iter().any(|dv| json_contains(dv, pv)))
        }
        (Value::Array(d), scalar) if !scalar.is_object() => d.iter().any(|dv| dv == scalar),
        (d, p) => d == p,
    }
}

/// A top-level stored entity (User or Job).
pub trait ParentDocument: Serialize + DeserializeOwned + Send + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;

    fn touch(&mut self, now: DateTime<Utc>);
}

pub async fn insert_document<P: ParentDocument>(
    store: &dyn DocumentStore,
    doc: &P,
) -> Result<(), AppError> {
    store
        .insert(P::COLLECTION, doc.id(), serde_json::to_value(doc)?)
        .await
}

pub async fn load<P: ParentDocument>(
    store: &dyn DocumentStore,
    id: Uuid,
) -> Result<P, AppError> {
    let raw = store
        .get(P::COLLECTION, id)
        .await?
        .ok_or_else(|| not_found::<P>(id))?;
    Ok(serde_json::from_value(raw)?)
}

pub async fn find_all<P: ParentDocument>(
    store: &dyn DocumentStore,
    probe: Value,
) -> Result<Vec<P>, AppError> {
    store
        .find_containing(P::COLLECTION, probe)
        .await?
        .into_iter()
        .map(|raw| serde_json::from_value(raw).map_err(AppError::from))
        .collect()
}

pub async fn find_one<P: ParentDocument>(
    store: &dyn DocumentStore,
    probe: Value,
) -> Result<Option<P>, AppError> {
    match store.find_one_containing(P::COLLECTION, probe).await? {
        Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
        None => Ok(None),
    }
}

/// Loads a parent, applies `f`, bumps its update timestamp and persists it,
/// all under the store's per-document lock. Returns the saved parent and
/// whatever `f` produced.
pub async fn modify<P, R, F>(
    store: &dyn DocumentStore,
    id: Uuid,
    f: F,
) -> Result<(P, R), AppError>
where
    P: ParentDocument,
    R: Send,
    F: FnOnce(&mut P) -> Result<R, AppError> + Send,
{
    let mut output: Option<R> = None;
    let slot = &mut output;
    let saved = store
        .update(
            P::COLLECTION,
            id,
            Box::new(move |raw: Value| -> Result<Value, AppError> {
                let mut parent: P = serde_json::from_value(raw)?;
                let result = f(&mut parent)?;
                parent.touch(Utc::now());
                *slot = Some(result);
                Ok(serde_json::to_value(&parent)?)
            }),
        )
        .await?;

    let parent: P = serde_json::from_value(saved)?;
    let result = output.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("document mutation produced no result"))
    })?;
    Ok((parent, result))
}

pub fn not_found<P: ParentDocument>(id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {id} not found", P::COLLECTION.label()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_containment_is_subset() {
        let doc = json!({"employerId": "e1", "title": "Rust dev"});
        assert!(json_contains(&doc, &json!({"employerId": "e1"})));
        assert!(!json_contains(&doc, &json!({"employerId": "e2"})));
        assert!(!json_contains(&doc, &json!({"missing": "e1"})));
    }

    #[test]
    fn test_nested_array_containment_matches_any_element() {
        let doc = json!({
            "applications": [
                {"id": "a1", "status": "pending"},
                {"id": "a2", "status": "accepted"}
            ]
        });
        assert!(json_contains(&doc, &json!({"applications": [{"id": "a2"}]})));
        assert!(!json_contains(&doc, &json!({"applications": [{"id": "a3"}]})));
    }

    #[test]
    fn test_empty_probe_matches_everything() {
        assert!(json_contains(&json!({"a": 1}), &json!({})));
    }

    #[test]
    fn test_array_contains_scalar() {
        assert!(json_contains(&json!(["rust", "go"]), &json!("rust")));
        assert!(!json_contains(&json!(["rust", "go"]), &json!("java")));
    }
}
