//! Document statistics and LLM-backed analysis.
//!
//! [`document_stats`] is pure. [`analyze`] asks the synthesizer for a
//! one-word sentiment and a short keyword list, then attaches the stats.

use serde::Serialize;

use crate::llm::{generate_or_explain, is_error_answer, LlmProvider};
use crate::models::{Document, SourceType};
use crate::prompt::{keyword_prompt, sentiment_prompt};

/// Number of keywords requested from the model.
pub const MAX_KEYWORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub length: usize,
    pub summary_length: usize,
    pub word_count: usize,
    pub line_count: usize,
}

/// Character, word, and line counts for a document and its summary.
pub fn document_stats(raw_text: &str, summary: Option<&str>) -> DocumentStats {
    DocumentStats {
        length: raw_text.chars().count(),
        summary_length: summary.map(|s| s.chars().count()).unwrap_or(0),
        word_count: raw_text.split_whitespace().count(),
        line_count: raw_text.matches('\n').count() + 1,
    }
}

/// Split a comma-separated model reply into at most `max` keywords.
pub fn parse_keywords(reply: &str, max: usize) -> Vec<String> {
    reply
        .split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub sentiment: String,
    pub keywords: Vec<String>,
    pub stats: DocumentStats,
}

/// Sentiment, keywords, and stats for one document.
///
/// LLM failures never abort the analysis: the sentiment carries the
/// degraded error text and the keyword list is left empty.
pub async fn analyze(llm: &dyn LlmProvider, raw_text: &str, summary: Option<&str>) -> Analysis {
    let sentiment = generate_or_explain(llm, &sentiment_prompt(raw_text)).await;

    let keyword_reply = generate_or_explain(llm, &keyword_prompt(raw_text, MAX_KEYWORDS)).await;
    let keywords = if is_error_answer(&keyword_reply) {
        Vec::new()
    } else {
        parse_keywords(&keyword_reply, MAX_KEYWORDS)
    };

    Analysis {
        sentiment,
        keywords,
        stats: document_stats(raw_text, summary),
    }
}

/// One row of the knowledge-base overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOverview {
    pub id: i64,
    pub source: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub length: usize,
    pub summary_length: usize,
}

impl From<&Document> for DocumentOverview {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            source: doc.path_or_url.clone(),
            source_type: doc.source_type,
            length: doc.raw_text.chars().count(),
            summary_length: doc.summary.as_deref().map(|s| s.chars().count()).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    #[test]
    fn test_stats() {
        let stats = document_stats("one two\nthree", Some("sum"));
        assert_eq!(
            stats,
            DocumentStats {
                length: 13,
                summary_length: 3,
                word_count: 3,
                line_count: 2,
            }
        );
    }

    #[test]
    fn test_stats_empty() {
        let stats = document_stats("", None);
        assert_eq!(stats.length, 0);
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.line_count, 1);
        assert_eq!(stats.summary_length, 0);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_keywords(" cat, mat ,, sat,on,the,extra", 5),
            vec!["cat", "mat", "sat", "on", "the"]
        );
        assert!(parse_keywords("", 5).is_empty());
    }

    struct ByPrompt;

    #[async_trait]
    impl LlmProvider for ByPrompt {
        fn name(&self) -> &str {
            "by-prompt"
        }
        fn model(&self) -> &str {
            "test"
        }
        async fn generate(&self, prompt: &str) -> Result<String> {
            if prompt.starts_with("You are a sentiment classifier") {
                Ok("Positive\n".to_string())
            } else {
                Ok("cats, mats".to_string())
            }
        }
    }

    struct Down;

    #[async_trait]
    impl LlmProvider for Down {
        fn name(&self) -> &str {
            "down"
        }
        fn model(&self) -> &str {
            "test"
        }
        async fn generate(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("quota exceeded")
        }
    }

    #[tokio::test]
    async fn test_analyze() {
        let a = analyze(&ByPrompt, "The cat sat on the mat.", None).await;
        assert_eq!(a.sentiment, "Positive");
        assert_eq!(a.keywords, vec!["cats", "mats"]);
        assert_eq!(a.stats.word_count, 6);
    }

    #[tokio::test]
    async fn test_analyze_degrades() {
        let a = analyze(&Down, "text", None).await;
        assert!(a.sentiment.starts_with("Error calling LLM"));
        assert!(a.keywords.is_empty());
        assert_eq!(a.stats.length, 4);
    }
}
