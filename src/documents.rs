//! Knowledge base management commands: `documents`, `delete`, `clear`,
//! and `ingest`.

use anyhow::{bail, Result};

use ragdesk_core::analysis::DocumentOverview;

use crate::app::App;

/// Print every stored document with its length and summary state.
pub async fn run_list(app: &App) -> Result<()> {
    let docs = app.store.list().await?;
    if docs.is_empty() {
        println!("No documents. Add some with `ragdesk ingest <path|url>`.");
        return Ok(());
    }

    println!(
        "{:<6} {:<6} {:>10} {:<8} SOURCE",
        "ID", "TYPE", "CHARS", "SUMMARY"
    );
    for doc in &docs {
        let overview = DocumentOverview::from(doc);
        let summarized = if overview.summary_length > 0 { "yes" } else { "-" };
        println!(
            "{:<6} {:<6} {:>10} {:<8} {}",
            overview.id, overview.source_type.as_str(), overview.length, summarized, overview.source
        );
    }
    println!();
    println!("{} document(s)", docs.len());
    Ok(())
}

pub async fn run_delete(app: &App, id: i64) -> Result<()> {
    if !app.store.delete(id).await? {
        bail!("document not found: {}", id);
    }
    println!("Deleted document {}", id);
    Ok(())
}

pub async fn run_clear(app: &App) -> Result<()> {
    let removed = app.store.clear().await?;
    println!("Removed {} document(s)", removed);
    Ok(())
}

/// Ingest each target (file, directory, or URL). Individual failures are
/// reported and skipped; the command fails only if nothing was ingested.
pub async fn run_ingest(app: &App, targets: &[String]) -> Result<()> {
    let mut ingested = 0usize;
    let mut failed = 0usize;

    for target in targets {
        match app.ingestor.ingest_path(target).await {
            Ok((ok, errors)) => {
                for doc in &ok {
                    let ocr = if doc.ocr { " (ocr)" } else { "" };
                    println!(
                        "  + [{}] {:<5} {} chars  {}{}",
                        doc.id, doc.source_type.as_str(), doc.chars, doc.path_or_url, ocr
                    );
                }
                for (path, err) in &errors {
                    println!("  ! {}: {}", path, err);
                }
                ingested += ok.len();
                failed += errors.len();
            }
            Err(e) => {
                println!("  ! {}: {}", target, e);
                failed += 1;
            }
        }
    }

    println!();
    println!("Ingested {} document(s), {} failed", ingested, failed);
    if ingested == 0 && failed > 0 {
        bail!("nothing was ingested");
    }
    Ok(())
}
