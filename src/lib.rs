//! # ragdesk
//!
//! Retrieval-augmented question answering over your own documents.
//!
//! Documents (text, DOCX, PDF, images, web pages) are ingested into a
//! SQLite knowledge base. Each question rebuilds an exact vector index over
//! the stored documents, retrieves the nearest chunks, and asks an LLM to
//! answer from them. Answers can be exported as CSV, XLSX, or DOCX.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Ingestion  │──▶│  Documents  │──▶│  Vector   │
//! │ file/url/OCR│   │  (SQLite)   │   │  store    │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │ top-k chunks
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │(ragdesk) │       │  (axum)  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! The pure pipeline (chunking, vector store, prompts, orchestrators) lives
//! in the `ragdesk-core` crate; this crate adds I/O: configuration, SQLite,
//! extraction, OCR, network providers, export, the CLI, and the server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`app`] | Wiring of store, providers, and ingestor |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite document store |
//! | [`extract`] | Text extraction from DOCX, PDF, and HTML |
//! | [`ocr`] | OCR through tesseract and pdftoppm |
//! | [`ingest`] | File, upload, and URL ingestion |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Answer synthesizers |
//! | [`export`] | CSV, XLSX, and DOCX export |
//! | [`documents`] | Knowledge base CLI commands |
//! | [`ask`] | Question answering CLI commands |
//! | [`server`] | HTTP server |

pub mod app;
pub mod ask;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod ocr;
pub mod server;
pub mod sqlite_store;
