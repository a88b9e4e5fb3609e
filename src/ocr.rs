//! OCR through external tools.
//!
//! Images go straight to `tesseract`; PDFs are first rasterized page by
//! page with `pdftoppm` (poppler-utils). Both functions return the
//! recognized text or an [`OcrError`] whose [`OcrErrorKind`] lets callers
//! decide on a fallback.
//!
//! Work happens in a uuid-named directory under the system temp dir, which
//! is removed afterwards whether OCR succeeded or not.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;

/// Rasterization resolution handed to `pdftoppm`.
const PDF_DPI: &str = "150";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrErrorKind {
    /// `tesseract` or `pdftoppm` is not installed.
    ToolMissing,
    /// Temp file handling failed.
    Io,
    /// A tool ran but exited unsuccessfully.
    ToolFailed,
    /// OCR ran but recognized no text.
    Empty,
}

impl fmt::Display for OcrErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OcrErrorKind::ToolMissing => "tool missing",
            OcrErrorKind::Io => "i/o error",
            OcrErrorKind::ToolFailed => "tool failed",
            OcrErrorKind::Empty => "no text recognized",
        })
    }
}

#[derive(Debug, Error)]
#[error("OCR {kind}: {message}")]
pub struct OcrError {
    pub kind: OcrErrorKind,
    pub message: String,
}

impl OcrError {
    fn new(kind: OcrErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn io(context: &str, err: std::io::Error) -> Self {
        Self::new(OcrErrorKind::Io, format!("{}: {}", context, err))
    }
}

/// Run an external program and return its stdout.
async fn run_tool(program: &str, args: &[&str]) -> Result<Vec<u8>, OcrError> {
    let output = Command::new(program).args(args).output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OcrError::new(
                OcrErrorKind::ToolMissing,
                format!("{} not found on PATH", program),
            )
        } else {
            OcrError::io(program, e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(OcrError::new(
            OcrErrorKind::ToolFailed,
            format!("{} exited with {}: {}", program, output.status, stderr.trim()),
        ));
    }
    Ok(output.stdout)
}

async fn tesseract(image: &Path) -> Result<String, OcrError> {
    let image = image.to_string_lossy();
    let stdout = run_tool("tesseract", &[image.as_ref(), "stdout"]).await?;
    Ok(page_text(&stdout))
}

/// Tesseract ends every page with a form feed; drop it along with any
/// trailing whitespace.
fn page_text(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .replace('\u{c}', "")
        .trim_end()
        .to_string()
}

/// Scratch directory removed on drop.
struct ScratchDir(PathBuf);

impl ScratchDir {
    async fn create(prefix: &str) -> Result<Self, OcrError> {
        let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| OcrError::io("creating temp dir", e))?;
        Ok(Self(dir))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn non_empty(text: String) -> Result<String, OcrError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(OcrError::new(OcrErrorKind::Empty, "OCR produced no text"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// OCR an image held in memory.
pub async fn ocr_image(bytes: &[u8]) -> Result<String, OcrError> {
    let scratch = ScratchDir::create("ragdesk-ocr-img").await?;
    let image_path = scratch.0.join("image");
    tokio::fs::write(&image_path, bytes)
        .await
        .map_err(|e| OcrError::io("writing image", e))?;

    non_empty(tesseract(&image_path).await?)
}

/// Rasterize a PDF and OCR every page, joining page texts with newlines.
pub async fn ocr_pdf(path: &Path) -> Result<String, OcrError> {
    let scratch = ScratchDir::create("ragdesk-ocr-pdf").await?;
    let prefix = scratch.0.join("page");

    let pdf = path.to_string_lossy();
    let prefix_str = prefix.to_string_lossy();
    run_tool(
        "pdftoppm",
        &["-png", "-r", PDF_DPI, pdf.as_ref(), prefix_str.as_ref()],
    )
    .await?;

    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(&scratch.0)
        .await
        .map_err(|e| OcrError::io("listing rasterized pages", e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| OcrError::io("listing rasterized pages", e))?
    {
        let p = entry.path();
        if p.extension().map(|e| e == "png").unwrap_or(false) {
            pages.push(p);
        }
    }
    // pdftoppm zero-pads page numbers, so lexical order is page order
    pages.sort();

    if pages.is_empty() {
        return Err(OcrError::new(
            OcrErrorKind::ToolFailed,
            "pdftoppm produced no page images",
        ));
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page in &pages {
        texts.push(tesseract(page).await?);
    }

    tracing::debug!(pages = pages.len(), path = %path.display(), "OCR complete");
    non_empty(texts.join("\n"))
}
