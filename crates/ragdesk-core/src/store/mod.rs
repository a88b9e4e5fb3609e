//! Document storage abstraction.
//!
//! The [`DocumentStore`] trait is the persistent knowledge base: every
//! ingested document lands here, and the orchestrators read all of them back
//! to build a fresh vector store per request.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, NewDocument};

pub use memory::InMemoryDocumentStore;

/// Abstract document store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](DocumentStore::insert) | Persist a new document, returning its id |
/// | [`list`](DocumentStore::list) | All documents in insertion order |
/// | [`get`](DocumentStore::get) | One document by id |
/// | [`update_summary`](DocumentStore::update_summary) | Set a document's summary |
/// | [`delete`](DocumentStore::delete) | Remove one document |
/// | [`clear`](DocumentStore::clear) | Remove every document |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, doc: NewDocument) -> Result<i64>;

    async fn list(&self) -> Result<Vec<Document>>;

    async fn get(&self, id: i64) -> Result<Option<Document>>;

    /// Returns `false` if no document has this id.
    async fn update_summary(&self, id: i64, summary: &str) -> Result<bool>;

    /// Returns `false` if no document has this id.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Returns the number of documents removed.
    async fn clear(&self) -> Result<u64>;
}
