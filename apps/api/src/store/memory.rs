use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{json_contains, Collection, DocumentStore, Mutation};
use crate::errors::AppError;

/// In-process store used by tests and `DOCUMENT_STORE=memory`.
///
/// Documents are kept in insertion order per collection. Every operation
/// holds the mutex for its full duration, so `update` is atomic.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<Collection, Vec<(Uuid, Value)>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Collection, Vec<(Uuid, Value)>>>, AppError> {
        self.collections
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store mutex poisoned")))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), AppError> {
        let mut guard = self.lock()?;
        let docs = guard.entry(collection).or_default();
        if docs.iter().any(|(existing, _)| *existing == id) {
            return Err(AppError::Conflict(format!(
                "{} {id} already exists",
                collection.label()
            )));
        }
        docs.push((id, doc));
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn update<'a>(
        &'a self,
        collection: Collection,
        id: Uuid,
        mutation: Mutation<'a>,
    ) -> Result<Value, AppError> {
        let mut guard = self.lock()?;
        let slot = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id))
            .map(|(_, doc)| doc)
            .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", collection.label())))?;

        let updated = mutation(slot.clone())?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError> {
        let mut guard = self.lock()?;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|(doc_id, _)| *doc_id != id);
        Ok(docs.len() != before)
    }

    async fn find_containing(
        &self,
        collection: Collection,
        probe: Value,
    ) -> Result<Vec<Value>, AppError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .rev()
                    .filter(|(_, doc)| json_contains(doc, &probe))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_failed_mutation_leaves_document_untouched() {
        let store = MemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store
            .insert(Collection::Users, id, json!({"name": "Ada"}))
            .await
            .unwrap();

        let result = store
            .update(
                Collection::Users,
                id,
                Box::new(|_: Value| -> Result<Value, AppError> {
                    Err(AppError::Validation("nope".into()))
                }),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let doc = store.get(Collection::Users, id).await.unwrap().unwrap();
        assert_eq!(doc, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let result = store
            .update(
                Collection::Jobs,
                Uuid::new_v4(),
                Box::new(|doc: Value| -> Result<Value, AppError> { Ok(doc) }),
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_containing_returns_newest_first() {
        let store = MemoryDocumentStore::new();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .insert(Collection::Jobs, first, json!({"employerId": "e1", "n": 1}))
            .await
            .unwrap();
        store
            .insert(Collection::Jobs, Uuid::new_v4(), json!({"employerId": "e2"}))
            .await
            .unwrap();
        store
            .insert(Collection::Jobs, second, json!({"employerId": "e1", "n": 2}))
            .await
            .unwrap();

        let found = store
            .find_containing(Collection::Jobs, json!({"employerId": "e1"}))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["n"], 2);
        assert_eq!(found[1]["n"], 1);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let store = MemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store.insert(Collection::Users, id, json!({})).await.unwrap();
        assert!(store.delete(Collection::Users, id).await.unwrap());
        assert!(!store.delete(Collection::Users, id).await.unwrap());
    }
}
