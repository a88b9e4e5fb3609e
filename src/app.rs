//! Wiring of the configured components.
//!
//! Both the CLI commands and the HTTP server start from an [`App`]: a
//! SQLite-backed document store, the configured embedder and synthesizer,
//! the [`QaEngine`] over them, and a [`DocumentIngestor`] writing into the
//! same store.

use std::sync::Arc;

use anyhow::{Context, Result};

use ragdesk_core::{DocumentStore, QaEngine};

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::ingest::DocumentIngestor;
use crate::llm::create_llm;
use crate::migrate;
use crate::sqlite_store::SqliteDocumentStore;

#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub engine: QaEngine,
    pub ingestor: Arc<DocumentIngestor>,
}

impl App {
    /// Connect to the database (creating the schema if needed) and build
    /// the providers named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config)
            .await
            .with_context(|| format!("Failed to open database {}", config.db.path.display()))?;
        migrate::apply(&pool).await?;

        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool));
        Self::with_store(config, store)
    }

    /// Build an app over an existing store.
    pub fn with_store(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let llm = create_llm(&config.llm)?;
        tracing::debug!(
            embedding = embedder.model_name(),
            llm = llm.name(),
            model = llm.model(),
            "providers ready"
        );

        let engine = QaEngine::new(store.clone(), embedder, llm, config.qa_options());
        let ingestor = Arc::new(DocumentIngestor::new(store.clone(), &config.ingest)?);

        Ok(Self {
            config: Arc::new(config.clone()),
            store,
            engine,
            ingestor,
        })
    }
}
