//! Keyed JSON document storage.
//!
//! Everything persisted (credentials, profiles, sessions, maintenance entries)
//! is a JSON object stored under `(collection, id)`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AeroResult, AeroTrackError, ErrorContext};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> AeroResult<Option<Value>>;

    /// Create or replace
    async fn put(&self, collection: &str, id: &str, body: &Value) -> AeroResult<()>;

    /// `false` when there was nothing to delete
    async fn delete(&self, collection: &str, id: &str) -> AeroResult<bool>;

    /// All documents in a collection, ordered by id
    async fn list(&self, collection: &str) -> AeroResult<Vec<Document>>;

    /// Documents whose top-level string `field` equals `value`
    async fn find(&self, collection: &str, field: &str, value: &str) -> AeroResult<Vec<Document>> {
        Ok(self
            .list(collection)
            .await?
            .into_iter()
            .filter(|doc| doc.body.get(field).and_then(Value::as_str) == Some(value))
            .collect())
    }

    /// Store under a freshly generated id and return it
    async fn insert(&self, collection: &str, body: &Value) -> AeroResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.put(collection, &id, body).await?;
        Ok(id)
    }
}

fn require_object(body: &Value) -> AeroResult<()> {
    if body.is_object() {
        Ok(())
    } else {
        Err(AeroTrackError::invalid_input("documents must be JSON objects"))
    }
}

// ============================================================================
// SQLite
// ============================================================================

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub async fn connect(database_url: &str) -> AeroResult<Self> {
        // An in-memory database exists per connection, so keep a single one
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_store_context("connect")?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("💾 Document store ready at {}", database_url);
        Ok(store)
    }

    async fn init_schema(&self) -> AeroResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .with_store_context("create documents table")?;

        Ok(())
    }

    fn decode(collection: &str, id: &str, body: &str) -> AeroResult<Value> {
        serde_json::from_str(body)
            .map_err(|e| AeroTrackError::encoding(format!("{}/{}", collection, id), e))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AeroResult<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_store_context("get document")?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body").with_store_context("read document body")?;
                Ok(Some(Self::decode(collection, id, &body)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, collection: &str, id: &str, body: &Value) -> AeroResult<()> {
        require_object(body)?;
        let encoded = serde_json::to_string(body)
            .map_err(|e| AeroTrackError::encoding(format!("{}/{}", collection, id), e))?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(encoded)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_store_context("put document")?;

        debug!("Stored {}/{}", collection, id);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AeroResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_store_context("delete document")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, collection: &str) -> AeroResult<Vec<Document>> {
        let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .with_store_context("list documents")?;

        rows.iter().map(|row| self.row_to_document(collection, row)).collect()
    }

    async fn find(&self, collection: &str, field: &str, value: &str) -> AeroResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, body FROM documents WHERE collection = ? AND json_extract(body, ?) = ? ORDER BY id",
        )
        .bind(collection)
        .bind(format!("$.{}", field))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .with_store_context("find documents")?;

        rows.iter().map(|row| self.row_to_document(collection, row)).collect()
    }
}

impl SqliteDocumentStore {
    fn row_to_document(&self, collection: &str, row: &sqlx::sqlite::SqliteRow) -> AeroResult<Document> {
        let id: String = row.try_get("id").with_store_context("read document id")?;
        let body: String = row.try_get("body").with_store_context("read document body")?;
        let body = Self::decode(collection, &id, &body)?;
        Ok(Document { id, body })
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store for tests and offline runs
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AeroResult<Option<Value>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn put(&self, collection: &str, id: &str, body: &Value) -> AeroResult<()> {
        require_object(body)?;
        let mut documents = self.documents.write().await;
        documents.insert((collection.to_string(), id.to_string()), body.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AeroResult<bool> {
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&(collection.to_string(), id.to_string())).is_some())
    }

    async fn list(&self, collection: &str) -> AeroResult<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, id), body)| Document {
                id: id.clone(),
                body: body.clone(),
            })
            .collect())
    }
}
