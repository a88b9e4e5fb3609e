//! Question answering commands: `ask`, `chat`, `summarize`, `analyze`.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use ragdesk_core::models::NOT_AVAILABLE;
use ragdesk_core::Session;

use crate::app::App;
use crate::export::{export, ExportFormat};

/// Answer one question and print the answer followed by the retrieved
/// sources. With `export_to`, the exchange is also written to a file.
pub async fn run_ask(
    app: &App,
    question: &str,
    top_k: Option<usize>,
    export_to: Option<&Path>,
    format: ExportFormat,
) -> Result<()> {
    let top_k = top_k.unwrap_or(app.engine.options().top_k);
    if top_k == 0 {
        bail!("--top-k must be at least 1");
    }

    let mut session = Session::new();
    let exchange = app.engine.answer(&mut session, question, top_k).await?;

    println!("{}", exchange.answer);

    if !exchange.rows.is_empty() {
        println!();
        println!("Sources:");
        for (i, row) in exchange.rows.iter().enumerate() {
            let row = row.normalize();
            let score = if row.score == NOT_AVAILABLE {
                String::new()
            } else {
                format!("  (distance {})", row.score)
            };
            println!("  {}. {}{}", i + 1, row.source, score);
        }
    }

    if let Some(path) = export_to {
        let bytes = export(format, &exchange.rows, &exchange.question, &exchange.answer)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        eprintln!("Exported to {}", path.display());
    }

    Ok(())
}

/// Interactive chat over stdin. `/clear` resets the history, `/exit` or
/// end of input quits.
pub async fn run_chat(app: &App, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(app.engine.options().top_k);
    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Chat started. Type /clear to reset the conversation, /exit to quit.");
    loop {
        eprint!("you> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        match message {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear_history();
                eprintln!("(history cleared)");
                continue;
            }
            _ => {}
        }

        let reply = app.engine.chat(&mut session, message, top_k).await?;
        println!("{}", reply);
    }

    Ok(())
}

/// Summarize every document that has no summary yet and print them all.
pub async fn run_summarize(app: &App) -> Result<()> {
    let summaries = app.engine.summarize_all().await?;
    if summaries.is_empty() {
        println!("No documents to summarize.");
        return Ok(());
    }

    for s in &summaries {
        println!("[{}] {}", s.id, s.source);
        println!("{}", s.summary.trim());
        println!();
    }
    Ok(())
}

/// Print sentiment, keywords, and text statistics for one document.
pub async fn run_analyze(app: &App, id: i64) -> Result<()> {
    let Some(analysis) = app.engine.analyze(id).await? else {
        bail!("document not found: {}", id);
    };

    let keywords = if analysis.keywords.is_empty() {
        "-".to_string()
    } else {
        analysis.keywords.join(", ")
    };

    println!("Document {}", id);
    println!("  Sentiment:   {}", analysis.sentiment);
    println!("  Keywords:    {}", keywords);
    println!("  Length:      {} chars", analysis.stats.length);
    println!("  Summary:     {} chars", analysis.stats.summary_length);
    println!("  Words:       {}", analysis.stats.word_count);
    println!("  Lines:       {}", analysis.stats.line_count);
    Ok(())
}
