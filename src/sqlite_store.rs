//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Maps each trait operation to one statement against the `documents`
//! table created by [`migrate`](crate::migrate).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use ragdesk_core::models::{Document, NewDocument, SourceType};
use ragdesk_core::store::DocumentStore;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let source_type: String = row.try_get("source_type")?;
    Ok(Document {
        id: row.try_get("id")?,
        source_type: source_type
            .parse::<SourceType>()
            .context("Corrupt documents row")?,
        path_or_url: row.try_get("path_or_url")?,
        raw_text: row.try_get("raw_text")?,
        summary: row.try_get("summary")?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, doc: NewDocument) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO documents (source_type, path_or_url, raw_text, summary) VALUES (?, ?, ?, ?)",
        )
        .bind(doc.source_type.as_str())
        .bind(&doc.path_or_url)
        .bind(&doc.raw_text)
        .bind(&doc.summary)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, source_type, path_or_url, raw_text, summary FROM documents ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, source_type, path_or_url, raw_text, summary FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn update_summary(&self, id: i64, summary: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE documents SET summary = ? WHERE id = ?")
            .bind(summary)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteDocumentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteDocumentStore::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = memory_store().await;
        let a = store
            .insert(NewDocument::new(SourceType::Pdf, "/up/a.pdf", "alpha"))
            .await
            .unwrap();
        let b = store
            .insert(NewDocument::new(SourceType::Url, "https://example.com", "bravo"))
            .await
            .unwrap();
        assert!(b > a);

        let docs = store.list().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source_type, SourceType::Pdf);
        assert_eq!(docs[1].path_or_url, "https://example.com");
        assert!(docs[1].summary.is_none());
    }

    #[tokio::test]
    async fn test_summary_delete_clear() {
        let store = memory_store().await;
        let id = store
            .insert(NewDocument::new(SourceType::File, "notes.txt", "text"))
            .await
            .unwrap();

        assert!(store.update_summary(id, "a summary").await.unwrap());
        assert_eq!(
            store.get(id).await.unwrap().unwrap().summary.as_deref(),
            Some("a summary")
        );
        assert!(!store.update_summary(id + 100, "x").await.unwrap());

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());

        store
            .insert(NewDocument::new(SourceType::Image, "scan.png", ""))
            .await
            .unwrap();
        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.list().await.unwrap().is_empty());
    }
}
