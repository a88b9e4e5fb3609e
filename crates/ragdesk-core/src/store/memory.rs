//! In-memory [`DocumentStore`] implementation for tests and embedding.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`. Ids are assigned
//! from a counter that is never reset, matching SQLite's AUTOINCREMENT.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Document, NewDocument};

use super::DocumentStore;

struct Inner {
    docs: Vec<Document>,
    next_id: i64,
}

pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                docs: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("document store lock poisoned")
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, doc: NewDocument) -> Result<i64> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.docs.push(Document {
            id,
            source_type: doc.source_type,
            path_or_url: doc.path_or_url,
            raw_text: doc.raw_text,
            summary: doc.summary,
        });
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Document>> {
        Ok(self.inner.read().map_err(poisoned)?.docs.clone())
    }

    async fn get(&self, id: i64) -> Result<Option<Document>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.docs.iter().find(|d| d.id == id).cloned())
    }

    async fn update_summary(&self, id: i64, summary: &str) -> Result<bool> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        match inner.docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => {
                doc.summary = Some(summary.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let before = inner.docs.len();
        inner.docs.retain(|d| d.id != id);
        Ok(inner.docs.len() != before)
    }

    async fn clear(&self) -> Result<u64> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let n = inner.docs.len() as u64;
        inner.docs.clear();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    #[tokio::test]
    async fn test_insert_list_get() {
        let store = InMemoryDocumentStore::new();
        let a = store
            .insert(NewDocument::new(SourceType::File, "a.txt", "alpha"))
            .await
            .unwrap();
        let b = store
            .insert(NewDocument::new(SourceType::Url, "https://x.test", "bravo"))
            .await
            .unwrap();
        assert_ne!(a, b);

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].path_or_url, "a.txt");
        assert_eq!(all[1].source_type, SourceType::Url);

        let got = store.get(b).await.unwrap().unwrap();
        assert_eq!(got.raw_text, "bravo");
        assert!(got.summary.is_none());
        assert!(store.get(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_summary() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert(NewDocument::new(SourceType::File, "a.txt", "alpha"))
            .await
            .unwrap();
        assert!(store.update_summary(id, "short").await.unwrap());
        assert!(!store.update_summary(id + 1, "nope").await.unwrap());
        assert_eq!(
            store.get(id).await.unwrap().unwrap().summary.as_deref(),
            Some("short")
        );
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert(NewDocument::new(SourceType::File, "a.txt", "alpha"))
            .await
            .unwrap();
        store
            .insert(NewDocument::new(SourceType::File, "b.txt", "bravo"))
            .await
            .unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);

        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.list().await.unwrap().is_empty());

        // ids are not reused after a clear
        let next = store
            .insert(NewDocument::new(SourceType::File, "c.txt", "charlie"))
            .await
            .unwrap();
        assert!(next > id);
    }
}
