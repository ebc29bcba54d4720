use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{Collection, DocumentStore, Mutation};
use crate::errors::AppError;

/// Postgres-backed store: one table per collection, the document in a JSONB column.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-index violation to Conflict; everything else stays a database error.
fn map_write_error(collection: Collection, e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!(
                "{} conflicts with an existing record",
                collection.label()
            ));
        }
    }
    AppError::Database(e)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), AppError> {
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", collection.table());
        sqlx::query(&sql)
            .bind(id)
            .bind(&doc)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", collection.table());
        Ok(sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update<'a>(
        &'a self,
        collection: Collection,
        id: Uuid,
        mutation: Mutation<'a>,
    ) -> Result<Value, AppError> {
        let table = collection.table();
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent read-modify-write cycles on one parent.
        let current: Option<Value> =
            sqlx::query_scalar(&format!("SELECT doc FROM {table} WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current
            .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", collection.label())))?;

        // Dropping `tx` on error rolls the transaction back.
        let updated = mutation(current)?;

        sqlx::query(&format!(
            "UPDATE {table} SET doc = $2, updated_at = now() WHERE id = $1"
        ))
        .bind(id)
        .bind(&updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(collection, e))?;

        tx.commit().await?;
        debug!("Persisted {} {id}", collection.label());
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_containing(
        &self,
        collection: Collection,
        probe: Value,
    ) -> Result<Vec<Value>, AppError> {
        let sql = format!(
            "SELECT doc FROM {} WHERE doc @> $1 ORDER BY created_at DESC",
            collection.table()
        );
        Ok(sqlx::query_scalar::<_, Value>(&sql)
            .bind(&probe)
            .fetch_all(&self.pool)
            .await?)
    }
}
