//! Document ingestion.
//!
//! Turns files, uploads, and URLs into [`Document`](ragdesk_core::models::Document)
//! rows. The loader is chosen by scheme or extension:
//!
//! | Input | Stored as | Text from |
//! |-------|-----------|-----------|
//! | `http://`, `https://` | `url` | fetched HTML, visible text only |
//! | `.png`, `.jpg`, `.jpeg` | `image` | OCR (empty text if OCR fails) |
//! | `.pdf` | `pdf` | OCR, then native extraction if OCR fails or finds nothing |
//! | anything else | `file` | `.docx` paragraphs, `.pdf` pages, or plain text |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use ragdesk_core::models::{NewDocument, SourceType};
use ragdesk_core::DocumentStore;

use crate::config::IngestConfig;
use crate::extract::{self, ExtractError};
use crate::ocr;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Failed to store document: {0}")]
    Store(String),
}

/// Outcome of ingesting one input.
#[derive(Debug, Clone, Serialize)]
pub struct Ingested {
    pub id: i64,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub path_or_url: String,
    /// Whether the stored text came from OCR.
    pub ocr: bool,
    pub chars: usize,
}

pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// The source type a local file is stored under.
pub fn classify(path: &Path) -> SourceType {
    let ext = extension(path);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        SourceType::Image
    } else if ext == "pdf" {
        SourceType::Pdf
    } else {
        SourceType::File
    }
}

/// Reduce an uploaded file name to a bare file name with no directories.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        format!("upload-{}", uuid::Uuid::new_v4())
    } else {
        base.to_string()
    }
}

pub struct DocumentIngestor {
    store: Arc<dyn DocumentStore>,
    client: reqwest::Client,
    ocr: bool,
    upload_dir: PathBuf,
}

impl DocumentIngestor {
    pub fn new(store: Arc<dyn DocumentStore>, config: &IngestConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.url_timeout_secs))
            .user_agent(concat!("ragdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            store,
            client,
            ocr: config.ocr,
            upload_dir: config.upload_dir.clone(),
        })
    }

    /// Extract text from a path or URL without storing it.
    pub async fn load(&self, path_or_url: &str) -> Result<String, IngestError> {
        if is_url(path_or_url) {
            self.load_url(path_or_url).await
        } else {
            load_path(Path::new(path_or_url)).await
        }
    }

    async fn load_url(&self, url: &str) -> Result<String, IngestError> {
        let fetch_err = |reason: String| IngestError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;
        let html = response.text().await.map_err(|e| fetch_err(e.to_string()))?;

        Ok(extract::extract_html(&html))
    }

    async fn store(
        &self,
        source_type: SourceType,
        path_or_url: String,
        text: String,
        ocr: bool,
    ) -> Result<Ingested, IngestError> {
        let chars = text.chars().count();
        let id = self
            .store
            .insert(NewDocument::new(source_type, path_or_url.clone(), text))
            .await
            .map_err(|e| IngestError::Store(format!("{:#}", e)))?;

        tracing::info!(id, %source_type, source = %path_or_url, chars, ocr, "document ingested");
        Ok(Ingested {
            id,
            source_type,
            path_or_url,
            ocr,
            chars,
        })
    }

    /// Ingest one local file.
    pub async fn ingest_file(&self, path: &Path) -> Result<Ingested, IngestError> {
        let source_type = classify(path);
        let path_str = path.display().to_string();

        let (text, from_ocr) = match source_type {
            SourceType::Image => self.image_text(path).await?,
            SourceType::Pdf => self.pdf_text(path).await?,
            _ => (load_path(path).await?, false),
        };

        self.store(source_type, path_str, text, from_ocr).await
    }

    async fn image_text(&self, path: &Path) -> Result<(String, bool), IngestError> {
        if !self.ocr {
            tracing::warn!(path = %path.display(), "OCR disabled, storing image without text");
            return Ok((String::new(), false));
        }
        let bytes = read_file(path).await?;
        match ocr::ocr_image(&bytes).await {
            Ok(text) => Ok((text, true)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "image OCR failed");
                Ok((String::new(), false))
            }
        }
    }

    async fn pdf_text(&self, path: &Path) -> Result<(String, bool), IngestError> {
        if self.ocr {
            match ocr::ocr_pdf(path).await {
                Ok(text) => return Ok((text, true)),
                Err(e) => {
                    tracing::info!(path = %path.display(), error = %e, "PDF OCR unavailable, using native extraction");
                }
            }
        }
        Ok((load_path(path).await?, false))
    }

    /// Fetch a web page and store its visible text.
    pub async fn ingest_url(&self, url: &str) -> Result<Ingested, IngestError> {
        let text = self.load_url(url).await?;
        self.store(SourceType::Url, url.to_string(), text, false).await
    }

    /// Save uploaded bytes into the upload directory, then ingest the file.
    pub async fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> Result<Ingested, IngestError> {
        let name = sanitize_filename(filename);
        let dest = self.upload_dir.join(&name);

        let io_err = |source: std::io::Error| IngestError::Read {
            path: dest.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(io_err)?;
        tokio::fs::write(&dest, bytes).await.map_err(io_err)?;

        self.ingest_file(&dest).await
    }

    /// Ingest a URL, a file, or every file under a directory.
    ///
    /// Directory walks continue past individual failures; the failures are
    /// returned alongside the successes.
    pub async fn ingest_path(
        &self,
        target: &str,
    ) -> Result<(Vec<Ingested>, Vec<(String, IngestError)>), IngestError> {
        if is_url(target) {
            return Ok((vec![self.ingest_url(target).await?], Vec::new()));
        }

        let path = Path::new(target);
        if !path.is_dir() {
            return Ok((vec![self.ingest_file(path).await?], Vec::new()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut ok = Vec::new();
        let mut failed = Vec::new();
        for file in files {
            match self.ingest_file(&file).await {
                Ok(ingested) => ok.push(ingested),
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping file");
                    failed.push((file.display().to_string(), e));
                }
            }
        }
        Ok((ok, failed))
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, IngestError> {
    tokio::fs::read(path).await.map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Extract text from a local file by extension; unknown types load as text.
pub async fn load_path(path: &Path) -> Result<String, IngestError> {
    let bytes = read_file(path).await?;
    let text = match extension(path).as_str() {
        "docx" => extract::extract_docx(&bytes)?,
        "pdf" => extract::extract_pdf(&bytes)?,
        _ => extract::decode_text(&bytes),
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_core::store::InMemoryDocumentStore;

    fn ingestor(store: Arc<InMemoryDocumentStore>, upload_dir: &Path) -> DocumentIngestor {
        let config = IngestConfig {
            upload_dir: upload_dir.to_path_buf(),
            url_timeout_secs: 2,
            ocr: false,
            ..IngestConfig::default()
        };
        DocumentIngestor::new(store, &config).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Path::new("scan.PNG")), SourceType::Image);
        assert_eq!(classify(Path::new("photo.jpeg")), SourceType::Image);
        assert_eq!(classify(Path::new("paper.pdf")), SourceType::Pdf);
        assert_eq!(classify(Path::new("notes.txt")), SourceType::File);
        assert_eq!(classify(Path::new("report.docx")), SourceType::File);
        assert_eq!(classify(Path::new("Makefile")), SourceType::File);
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com"));
        assert!(is_url("http://localhost:8080/x"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("./notes.txt"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\doc.pdf"), "doc.pdf");
        assert!(sanitize_filename("..").starts_with("upload-"));
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cat.txt");
        std::fs::write(&path, "The cat sat on the mat.").unwrap();

        let store = Arc::new(InMemoryDocumentStore::new());
        let ing = ingestor(store.clone(), tmp.path());
        let out = ing.ingest_file(&path).await.unwrap();
        assert_eq!(out.source_type, SourceType::File);
        assert!(!out.ocr);

        let docs = store.list().await.unwrap();
        assert_eq!(docs[0].raw_text, "The cat sat on the mat.");
        assert_eq!(docs[0].path_or_url, path.display().to_string());
    }

    #[tokio::test]
    async fn test_image_without_ocr_is_stored_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new());
        let ing = ingestor(store.clone(), tmp.path());

        let out = ing.ingest_upload("scan.png", b"\x89PNG fake").await.unwrap();
        assert_eq!(out.source_type, SourceType::Image);
        assert!(tmp.path().join("scan.png").exists());
        assert_eq!(store.list().await.unwrap()[0].raw_text, "");
    }

    #[tokio::test]
    async fn test_unreachable_url_is_fetch_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new());
        let ing = ingestor(store.clone(), tmp.path());

        let err = ing.ingest_url("http://127.0.0.1:9/nothing").await.unwrap_err();
        assert!(matches!(err, IngestError::Fetch { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let docs_dir = tmp.path().join("docs");
        std::fs::create_dir_all(docs_dir.join("nested")).unwrap();
        std::fs::write(docs_dir.join("a.txt"), "alpha").unwrap();
        std::fs::write(docs_dir.join("nested/b.md"), "bravo").unwrap();

        let store = Arc::new(InMemoryDocumentStore::new());
        let ing = ingestor(store.clone(), tmp.path());
        let (ok, failed) = ing
            .ingest_path(&docs_dir.display().to_string())
            .await
            .unwrap();
        assert_eq!(ok.len(), 2);
        assert!(failed.is_empty());
    }
}
