//! libSQL implementation of `DocumentStore`

use std::path::Path;

use libsql::params;
use serde_json::Value;
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};
use crate::store::{merge_documents, DocumentStore, SetMode};

/// Documents stored as JSON text in the `documents` table
pub struct LibSqlStore {
    db: Mutex<Database>,
}

impl LibSqlStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open (and migrate) a database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory database (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    fn parse_body(collection: &str, id: &str, body: &str) -> Result<Value> {
        serde_json::from_str(body).map_err(|error| {
            Error::Store(format!("corrupt document {collection}/{id}: {error}"))
        })
    }
}

async fn read_body(db: &Database, collection: &str, id: &str) -> Result<Option<String>> {
    let mut rows = db
        .connection()
        .query(
            "SELECT body FROM documents WHERE collection = ? AND id = ?",
            [collection, id],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row.get::<String>(0)?)),
        None => Ok(None),
    }
}

async fn upsert_body(db: &Database, collection: &str, id: &str, body: String) -> Result<()> {
    db.connection()
        .execute(
            "INSERT INTO documents (collection, id, body, written_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, written_at = excluded.written_at",
            params![collection, id, body, written_at()],
        )
        .await?;
    Ok(())
}

fn written_at() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl DocumentStore for LibSqlStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let db = self.db.lock().await;
        read_body(&db, collection, id)
            .await?
            .map(|body| Self::parse_body(collection, id, &body))
            .transpose()
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
        mode: SetMode,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let document = match mode {
            SetMode::Overwrite => document.clone(),
            SetMode::Merge => match read_body(&db, collection, id).await? {
                Some(body) => {
                    let mut existing = Self::parse_body(collection, id, &body)?;
                    merge_documents(&mut existing, document);
                    existing
                }
                None => document.clone(),
            },
        };
        upsert_body(&db, collection, id, serde_json::to_string(&document)?).await
    }

    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        expected: Option<&Value>,
        document: &Value,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let body = serde_json::to_string(document)?;

        let changed = match expected {
            None => {
                db.connection()
                    .execute(
                        "INSERT OR IGNORE INTO documents (collection, id, body, written_at) VALUES (?, ?, ?, ?)",
                        params![collection, id, body, written_at()],
                    )
                    .await?
            }
            Some(expected) => {
                // Compare parsed values so formatting differences in stored text don't matter.
                let Some(current) = read_body(&db, collection, id).await? else {
                    return Ok(false);
                };
                if Self::parse_body(collection, id, &current)? != *expected {
                    return Ok(false);
                }
                db.connection()
                    .execute(
                        "UPDATE documents SET body = ?, written_at = ? WHERE collection = ? AND id = ? AND body = ?",
                        params![body, written_at(), collection, id, current],
                    )
                    .await?
            }
        };

        Ok(changed > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "DELETE FROM documents WHERE collection = ? AND id = ?",
                [collection, id],
            )
            .await?;
        Ok(())
    }

    async fn compare_and_delete(
        &self,
        collection: &str,
        id: &str,
        expected: &Value,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let Some(current) = read_body(&db, collection, id).await? else {
            return Ok(false);
        };
        if Self::parse_body(collection, id, &current)? != *expected {
            return Ok(false);
        }
        let removed = db
            .connection()
            .execute(
                "DELETE FROM documents WHERE collection = ? AND id = ? AND body = ?",
                params![collection, id, current],
            )
            .await?;
        Ok(removed > 0)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, body FROM documents WHERE collection = ? ORDER BY id",
                [collection],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let body: String = row.get(1)?;
            let document = Self::parse_body(collection, &id, &body)?;
            documents.push((id, document));
        }
        Ok(documents)
    }
}
