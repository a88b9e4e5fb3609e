//! Retrieval and conversational orchestrators.
//!
//! [`QaEngine`] ties the document store, the embedder, and the synthesizer
//! together. Every call rebuilds a fresh [`VectorStore`] from the documents
//! currently in the store, so there is no shared index to keep in sync.
//!
//! # Modes
//!
//! | Documents with text | `answer` prompt | `chat` prompt |
//! |---------------------|-----------------|---------------|
//! | none | the bare question | transcript + message |
//! | some | retrieved chunks + question, "Not found" fallback | retrieved chunks + transcript + message |

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::analysis::{self, Analysis, DocumentOverview};
use crate::embedding::EmbeddingProvider;
use crate::llm::{generate_or_explain, is_error_answer, LlmProvider};
use crate::models::{ExportRow, SearchHit};
use crate::prompt::{chat_prompt, context_prompt, render_transcript, summary_prompt};
use crate::session::{Exchange, Session, HISTORY_WINDOW};
use crate::store::DocumentStore;
use crate::vector_store::{VectorStore, VectorStoreError, DEFAULT_MAX_CHARS};

/// Answer returned for a blank question.
pub const EMPTY_QUESTION_ANSWER: &str = "Please enter a question.";

/// Retrieval tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct QaOptions {
    /// Default number of chunks retrieved per question.
    pub top_k: usize,
    /// Chunk size used when building the vector store.
    pub max_chars: usize,
    /// Turns of history shown to the model in chat mode.
    pub history_turns: usize,
}

impl Default for QaOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_chars: DEFAULT_MAX_CHARS,
            history_turns: HISTORY_WINDOW,
        }
    }
}

/// A document's summary as reported by [`QaEngine::summarize_all`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub source: String,
    pub summary: String,
}

#[derive(Clone)]
pub struct QaEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    options: QaOptions,
}

impl QaEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        options: QaOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            options,
        }
    }

    pub fn options(&self) -> &QaOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Build a vector store over every document that has text.
    ///
    /// Returns `None` when the knowledge base has nothing to index.
    pub async fn build_vector_store(&self) -> Result<Option<VectorStore>> {
        let docs = self.store.list().await.context("Failed to list documents")?;

        let mut vs = VectorStore::new();
        for doc in docs.iter().filter(|d| !d.raw_text.trim().is_empty()) {
            vs.add_document(&doc.raw_text, &doc.path_or_url, self.options.max_chars);
        }

        match vs.build(self.embedder.as_ref()).await {
            Ok(()) => Ok(Some(vs)),
            Err(VectorStoreError::EmptyIndex) => Ok(None),
            Err(e) => Err(e).context("Failed to build vector index"),
        }
    }

    /// Retrieve the `top_k` chunks nearest to `query`; empty when there are
    /// no documents.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let Some(vs) = self.build_vector_store().await? else {
            return Ok(Vec::new());
        };
        let hits = vs
            .search(self.embedder.as_ref(), query, top_k)
            .await
            .context("Vector search failed")?;
        tracing::debug!(chunks = vs.len(), hits = hits.len(), "retrieved context");
        Ok(hits)
    }

    /// Answer a question, grounding it in retrieved chunks when documents
    /// exist. The exchange is remembered on `session` for export.
    pub async fn answer(&self, session: &mut Session, question: &str, top_k: usize) -> Result<Exchange> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Exchange {
                question: String::new(),
                answer: EMPTY_QUESTION_ANSWER.to_string(),
                rows: Vec::new(),
            });
        }

        let hits = self.retrieve(question, top_k).await?;
        let prompt = if hits.is_empty() {
            tracing::info!("no documents indexed, answering from general knowledge");
            question.to_string()
        } else {
            let chunks: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
            context_prompt(&chunks, question)
        };

        let answer = generate_or_explain(self.llm.as_ref(), &prompt).await;

        let exchange = Exchange {
            question: question.to_string(),
            answer,
            rows: hits.iter().map(ExportRow::from).collect(),
        };
        session.set_last_exchange(exchange.clone());
        Ok(exchange)
    }

    /// One conversational turn. Appends the message and the reply to the
    /// session history and returns the reply.
    pub async fn chat(&self, session: &mut Session, message: &str, top_k: usize) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            bail!("Empty message.");
        }

        let transcript = render_transcript(session.recent(self.options.history_turns));
        let chunks: Vec<String> = self
            .retrieve(message, top_k)
            .await?
            .into_iter()
            .map(|h| h.text)
            .collect();

        let prompt = chat_prompt(&transcript, message, &chunks);
        let reply = generate_or_explain(self.llm.as_ref(), &prompt).await;

        session.push_exchange(message, &reply);
        Ok(reply)
    }

    /// Summarize every document that has no summary yet.
    ///
    /// Existing summaries are kept. Degraded LLM answers are reported but
    /// not persisted, so a later run retries them.
    pub async fn summarize_all(&self) -> Result<Vec<DocumentSummary>> {
        let docs = self.store.list().await.context("Failed to list documents")?;
        let mut out = Vec::with_capacity(docs.len());

        for doc in docs {
            let summary = match doc.summary.as_deref().filter(|s| !s.trim().is_empty()) {
                Some(existing) => existing.to_string(),
                None => {
                    let reply =
                        generate_or_explain(self.llm.as_ref(), &summary_prompt(&doc.raw_text)).await;
                    if !is_error_answer(&reply) {
                        self.store
                            .update_summary(doc.id, &reply)
                            .await
                            .with_context(|| format!("Failed to save summary for document {}", doc.id))?;
                    }
                    reply
                }
            };
            out.push(DocumentSummary {
                id: doc.id,
                source: doc.path_or_url,
                summary,
            });
        }

        Ok(out)
    }

    /// Analyze one document; `None` if the id is unknown.
    pub async fn analyze(&self, id: i64) -> Result<Option<Analysis>> {
        let Some(doc) = self.store.get(id).await? else {
            return Ok(None);
        };
        Ok(Some(
            analysis::analyze(self.llm.as_ref(), &doc.raw_text, doc.summary.as_deref()).await,
        ))
    }

    /// Length overview of every document.
    pub async fn overview(&self) -> Result<Vec<DocumentOverview>> {
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .map(DocumentOverview::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewDocument, SourceType};
    use crate::store::InMemoryDocumentStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Letters;

    #[async_trait]
    impl EmbeddingProvider for Letters {
        fn model_name(&self) -> &str {
            "letters"
        }
        fn dims(&self) -> usize {
            26
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[(c - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn model(&self) -> &str {
            "test"
        }
        async fn generate(&self, prompt: &str) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            Ok(format!("reply {}", prompts.len()))
        }
    }

    fn engine(store: Arc<InMemoryDocumentStore>, llm: Arc<Recorder>) -> QaEngine {
        QaEngine::new(store, Arc::new(Letters), llm, QaOptions::default())
    }

    #[tokio::test]
    async fn test_no_documents_forwards_bare_question() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let llm = Arc::new(Recorder::default());
        let qa = engine(store, llm.clone());
        let mut session = Session::new();

        let ex = qa.answer(&mut session, "What is Rust?", 4).await.unwrap();
        assert_eq!(ex.answer, "reply 1");
        assert!(ex.rows.is_empty());
        assert_eq!(llm.prompts.lock().unwrap()[0], "What is Rust?");
        assert_eq!(session.last_exchange().unwrap().question, "What is Rust?");
    }

    #[tokio::test]
    async fn test_blank_question_skips_llm() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let llm = Arc::new(Recorder::default());
        let qa = engine(store, llm.clone());
        let mut session = Session::new();

        let ex = qa.answer(&mut session, "   ", 4).await.unwrap();
        assert_eq!(ex.answer, EMPTY_QUESTION_ANSWER);
        assert!(llm.prompts.lock().unwrap().is_empty());
        assert!(session.last_exchange().is_none());
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .insert(NewDocument::new(SourceType::File, "doc1", "The cat sat on the mat."))
            .await
            .unwrap();
        store
            .insert(NewDocument::new(SourceType::File, "empty", "  "))
            .await
            .unwrap();
        let llm = Arc::new(Recorder::default());
        let qa = engine(store, llm.clone());
        let mut session = Session::new();

        let ex = qa
            .answer(&mut session, "Where did the cat sit?", 4)
            .await
            .unwrap();
        assert_eq!(ex.chunk_texts(), vec!["The cat sat on the mat."]);
        let prompt = &llm.prompts.lock().unwrap()[0];
        assert!(prompt.contains("The cat sat on the mat."));
        assert!(prompt.contains("Where did the cat sit?"));
        assert_eq!(ex.rows[0].normalize().source, "doc1");
    }

    #[tokio::test]
    async fn test_chat_windows_history() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let llm = Arc::new(Recorder::default());
        let qa = engine(store, llm.clone());
        let mut session = Session::new();

        for i in 0..5 {
            qa.chat(&mut session, &format!("message {i}"), 4).await.unwrap();
        }
        assert_eq!(session.history().len(), 10);

        // four prior exchanges exist; only the last six turns are shown
        let last_prompt = llm.prompts.lock().unwrap()[4].clone();
        assert!(!last_prompt.contains("User: message 0"));
        assert!(last_prompt.contains("User: message 1"));
        assert!(last_prompt.contains("Assistant: reply 4"));
        assert!(last_prompt.contains("User's latest message: message 4"));

        assert!(qa.chat(&mut session, "  ", 4).await.is_err());
    }

    #[tokio::test]
    async fn test_summarize_all_keeps_existing() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut with_summary = NewDocument::new(SourceType::File, "a", "alpha text");
        with_summary.summary = Some("already".to_string());
        store.insert(with_summary).await.unwrap();
        let b = store
            .insert(NewDocument::new(SourceType::File, "b", "bravo text"))
            .await
            .unwrap();
        let llm = Arc::new(Recorder::default());
        let qa = engine(store.clone(), llm.clone());

        let summaries = qa.summarize_all().await.unwrap();
        assert_eq!(summaries[0].summary, "already");
        assert_eq!(summaries[1].summary, "reply 1");
        assert_eq!(llm.prompts.lock().unwrap().len(), 1);
        assert_eq!(
            store.get(b).await.unwrap().unwrap().summary.as_deref(),
            Some("reply 1")
        );
    }

    #[tokio::test]
    async fn test_analyze_unknown_id() {
        let qa = engine(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(Recorder::default()),
        );
        assert!(qa.analyze(42).await.unwrap().is_none());
    }
}
