//! # ragdesk core
//!
//! I/O-free logic for ragdesk: data models, the line-packing chunker, the
//! embedding and LLM provider traits, the exact L2 vector index, the vector
//! store, prompt construction, conversation sessions, and the retrieval /
//! conversational orchestrators.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem code. Concrete
//! providers and the SQLite document store live in the `ragdesk` app crate.
//!
//! ## Pipeline
//!
//! ```text
//! Document ──▶ chunk_text ──▶ VectorStore::add_document
//!                                  │
//!                          build() │ EmbeddingProvider::embed (batch)
//!                                  ▼
//!                             FlatL2Index
//!                                  │
//!   question ──▶ search(top_k) ─────┘──▶ prompt ──▶ LlmProvider::generate
//! ```

pub mod analysis;
pub mod chunk;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod qa;
pub mod session;
pub mod store;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use qa::{QaEngine, QaOptions};
pub use session::{Exchange, Session};
pub use store::DocumentStore;
pub use vector_store::{VectorStore, VectorStoreError};
