//! Core data models used throughout ragdesk.
//!
//! These types represent the documents, chunks, retrieval hits, and
//! conversation turns that flow through the ingestion and retrieval
//! pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a document entered the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Url,
    Image,
    Pdf,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::File => "file",
            SourceType::Url => "url",
            SourceType::Image => "image",
            SourceType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(SourceType::File),
            "url" => Ok(SourceType::Url),
            "image" => Ok(SourceType::Image),
            "pdf" => Ok(SourceType::Pdf),
            other => anyhow::bail!("unknown source type: '{}'", other),
        }
    }
}

/// A document persisted in the document store.
///
/// Created on ingestion; only `summary` is ever updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: i64,
    pub source_type: SourceType,
    pub path_or_url: String,
    pub raw_text: String,
    pub summary: Option<String>,
}

/// A document that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub source_type: SourceType,
    pub path_or_url: String,
    pub raw_text: String,
    pub summary: Option<String>,
}

impl NewDocument {
    pub fn new(
        source_type: SourceType,
        path_or_url: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            path_or_url: path_or_url.into(),
            raw_text: raw_text.into(),
            summary: None,
        }
    }
}

/// A bounded slice of a document's text; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    /// Position of the chunk within its document, starting at 0.
    pub sequence_index: usize,
}

/// Per-chunk metadata returned alongside retrieved text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_id: usize,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: chunk.source.clone(),
            chunk_id: chunk.sequence_index,
        }
    }
}

/// One chunk returned by a vector search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    #[serde(rename = "meta")]
    pub metadata: ChunkMetadata,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used when rendering transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Placeholder for a missing source or file name in exports.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder for a missing score in exports.
pub const NOT_AVAILABLE: &str = "N/A";

/// Optional metadata attached to an [`ExportRow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowMetadata {
    pub source: Option<String>,
    pub file: Option<String>,
    pub score: Option<f32>,
}

/// A retrieved row as handed to the exporters.
///
/// Rows come in three shapes; every exporter consumes them through
/// [`ExportRow::normalize`] so they all see the same `(text, source, file,
/// score)` tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportRow {
    /// Bare chunk text.
    Text { text: String },
    /// Text plus a metadata record.
    WithMetadata { text: String, metadata: RowMetadata },
    /// A flat record; top-level fields win over the nested metadata.
    Record {
        text: String,
        source: Option<String>,
        file: Option<String>,
        score: Option<f32>,
        #[serde(default)]
        metadata: RowMetadata,
    },
}

/// The canonical row shape written by every exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRow {
    pub text: String,
    pub source: String,
    pub file: String,
    pub score: String,
}

impl ExportRow {
    pub fn text(text: impl Into<String>) -> Self {
        ExportRow::Text { text: text.into() }
    }

    pub fn normalize(&self) -> NormalizedRow {
        match self {
            ExportRow::Text { text } => NormalizedRow {
                text: text.clone(),
                source: UNKNOWN.to_string(),
                file: UNKNOWN.to_string(),
                score: NOT_AVAILABLE.to_string(),
            },
            ExportRow::WithMetadata { text, metadata } => {
                let source = metadata
                    .source
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string());
                NormalizedRow {
                    text: text.clone(),
                    file: metadata.file.clone().unwrap_or_else(|| source.clone()),
                    source,
                    score: format_score(metadata.score),
                }
            }
            ExportRow::Record {
                text,
                source,
                file,
                score,
                metadata,
            } => {
                let source = source
                    .clone()
                    .or_else(|| metadata.source.clone())
                    .unwrap_or_else(|| UNKNOWN.to_string());
                NormalizedRow {
                    text: text.clone(),
                    file: file.clone().unwrap_or_else(|| source.clone()),
                    source,
                    score: format_score(*score),
                }
            }
        }
    }
}

impl From<&SearchHit> for ExportRow {
    fn from(hit: &SearchHit) -> Self {
        ExportRow::WithMetadata {
            text: hit.text.clone(),
            metadata: RowMetadata {
                source: Some(hit.metadata.source.clone()),
                file: None,
                score: Some(hit.distance),
            },
        }
    }
}

fn format_score(score: Option<f32>) -> String {
    match score {
        Some(s) => format!("{:.4}", s),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_roundtrip() {
        for st in [
            SourceType::File,
            SourceType::Url,
            SourceType::Image,
            SourceType::Pdf,
        ] {
            assert_eq!(st.as_str().parse::<SourceType>().unwrap(), st);
        }
        assert!("video".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_normalize_plain_text() {
        let row = ExportRow::text("just text").normalize();
        assert_eq!(row.text, "just text");
        assert_eq!(row.source, "Unknown");
        assert_eq!(row.file, "Unknown");
        assert_eq!(row.score, "N/A");
    }

    #[test]
    fn test_normalize_metadata_file_defaults_to_source() {
        let row = ExportRow::WithMetadata {
            text: "t".to_string(),
            metadata: RowMetadata {
                source: Some("notes.txt".to_string()),
                file: None,
                score: None,
            },
        }
        .normalize();
        assert_eq!(row.source, "notes.txt");
        assert_eq!(row.file, "notes.txt");
        assert_eq!(row.score, "N/A");
    }

    #[test]
    fn test_normalize_record_prefers_top_level_source() {
        let row = ExportRow::Record {
            text: "t".to_string(),
            source: None,
            file: Some("a.pdf".to_string()),
            score: Some(0.5),
            metadata: RowMetadata {
                source: Some("nested".to_string()),
                ..Default::default()
            },
        }
        .normalize();
        assert_eq!(row.source, "nested");
        assert_eq!(row.file, "a.pdf");
        assert_eq!(row.score, "0.5000");
    }

    #[test]
    fn test_search_hit_becomes_metadata_row() {
        let hit = SearchHit {
            text: "chunk".to_string(),
            metadata: ChunkMetadata {
                source: "doc1".to_string(),
                chunk_id: 0,
            },
            distance: 0.25,
        };
        let row = ExportRow::from(&hit).normalize();
        assert_eq!(row.source, "doc1");
        assert_eq!(row.file, "doc1");
        assert_eq!(row.score, "0.2500");
    }
}
