use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, types::Json};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Document
///
/// A schemaless document as the store sees it: field name to JSON value.
/// Typed records are mapped from and to this shape by the service layer.
pub type Document = Map<String, Value>;

/// StoredDocument
///
/// A document together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// DocumentStore Trait
///
/// Collection-scoped contract of the external document database. This is a thin
/// pass-through: no encryption, validation or typing happens here.
///
/// **Send + Sync + async_trait** are required so that `Arc<dyn DocumentStore>`
/// can be shared across Axum's task boundaries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    // Returns documents in the store's own order (insertion order).
    async fn get_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    // Equality match on a single top-level field.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    // Persists a new document and returns its generated id.
    async fn create(&self, collection: &str, data: Document) -> Result<String, StoreError>;

    /// Merges `changes` into the stored document. Fields absent from `changes`
    /// are left untouched. Returns the merged document, or `None` if `id` does
    /// not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    // Returns false if nothing was deleted.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// DocumentStoreState
///
/// The concrete type used to share the persistence layer across the application state.
pub type DocumentStoreState = Arc<dyn DocumentStore>;

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// PostgresDocumentStore
///
/// Implements the document contract on a single JSONB table keyed by
/// `(collection, id)`.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new store instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the `documents` table if it does not exist yet. Safe to call on
    /// every startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                seq BIGSERIAL NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Json<Document>,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(data),)| data))
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let rows: Vec<(String, Json<Document>)> = sqlx::query_as(
            "SELECT id, data FROM documents WHERE collection = $1 ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(data))| StoredDocument { id, data })
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let rows: Vec<(String, Json<Document>)> = sqlx::query_as(
            r#"
            SELECT id, data FROM documents
            WHERE collection = $1 AND data -> $2 = $3
            ORDER BY seq
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(data))| StoredDocument { id, data })
            .collect())
    }

    async fn create(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let id = new_document_id();
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&data))
            .execute(&self.pool)
            .await?;

        tracing::debug!(collection, id = %id, "document created");
        Ok(id)
    }

    /// update
    ///
    /// Uses the JSONB concatenation operator, so keys in `changes` overwrite and
    /// every other key is preserved.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<(Json<Document>,)> = sqlx::query_as(
            r#"
            UPDATE documents SET data = data || $3
            WHERE collection = $1 AND id = $2
            RETURNING data
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&changes))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(data),)| data))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// InMemoryDocumentStore
///
/// Process-local implementation of `DocumentStore`, used by the test suites and
/// by local runs without `DATABASE_URL`. Collections keep insertion order. The
/// lock is never held across an await point.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document under a caller-chosen id. Lets tests seed raw or
    /// legacy data that did not go through a service.
    pub async fn insert_raw(&self, collection: &str, id: &str, data: Document) {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|doc| doc.id != id);
        docs.push(StoredDocument {
            id: id.to_string(),
            data,
        });
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .map(|doc| doc.data.clone()))
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| doc.data.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let id = new_document_id();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                data,
            });
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
        else {
            return Ok(None);
        };

        doc.data.extend(changes);
        Ok(Some(doc.data.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        Ok(docs.len() < before)
    }
}
