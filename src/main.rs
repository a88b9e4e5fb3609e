//! # ragdesk CLI
//!
//! The `ragdesk` binary manages the knowledge base, answers questions from
//! it, and serves the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! ragdesk --config ./config/ragdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragdesk init` | Create the SQLite database and schema |
//! | `ragdesk ingest <path\|url>...` | Ingest files, directories, or web pages |
//! | `ragdesk documents` | List stored documents |
//! | `ragdesk delete <id>` | Delete one document |
//! | `ragdesk clear` | Delete every document |
//! | `ragdesk ask "<question>"` | Answer a question from retrieved context |
//! | `ragdesk chat` | Interactive conversation over stdin |
//! | `ragdesk summarize` | Summarize documents that have none yet |
//! | `ragdesk analyze <id>` | Sentiment, keywords, and stats for a document |
//! | `ragdesk serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! ragdesk ingest ./docs https://example.com/faq
//! ragdesk ask "How do refunds work?" --top-k 6
//! ragdesk ask "How do refunds work?" --export answer.xlsx --format excel
//! RUST_LOG=ragdesk=debug ragdesk serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragdesk::app::App;
use ragdesk::export::ExportFormat;
use ragdesk::{ask, config, documents, migrate, server};

const DEFAULT_CONFIG_PATH: &str = "./config/ragdesk.toml";

/// ragdesk: retrieval-augmented question answering over your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file at the default location means built-in defaults.
#[derive(Parser)]
#[command(
    name = "ragdesk",
    about = "Retrieval-augmented question answering over your own documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Ingest files, directories (recursively), or http(s) URLs.
    ///
    /// Images are OCR'd with tesseract; PDFs are OCR'd first and fall back
    /// to their embedded text.
    Ingest {
        /// One or more paths or URLs.
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// List stored documents.
    Documents,

    /// Delete one document by id.
    Delete { id: i64 },

    /// Delete every document.
    Clear,

    /// Answer a question, grounded in the most relevant chunks.
    Ask {
        question: String,

        /// Number of chunks to retrieve (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Write the question, answer, and retrieved chunks to this file.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export format.
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },

    /// Chat interactively; history is kept for the length of the session.
    Chat {
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Summarize every document that has no summary yet.
    Summarize,

    /// Sentiment, keywords, and statistics for one document.
    Analyze { id: i64 },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ragdesk=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let allow_missing = cli.config == PathBuf::from(DEFAULT_CONFIG_PATH);
    let cfg = config::load_config_or_default(&cli.config, allow_missing)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized at {}", cfg.db.path.display());
        return Ok(());
    }
    if let Commands::Serve = cli.command {
        return server::run_server(&cfg).await;
    }

    let app = App::open(&cfg).await?;

    match cli.command {
        Commands::Ingest { targets } => documents::run_ingest(&app, &targets).await?,
        Commands::Documents => documents::run_list(&app).await?,
        Commands::Delete { id } => documents::run_delete(&app, id).await?,
        Commands::Clear => documents::run_clear(&app).await?,
        Commands::Ask {
            question,
            top_k,
            export,
            format,
        } => ask::run_ask(&app, &question, top_k, export.as_deref(), format).await?,
        Commands::Chat { top_k } => ask::run_chat(&app, top_k).await?,
        Commands::Summarize => ask::run_summarize(&app).await?,
        Commands::Analyze { id } => ask::run_analyze(&app, id).await?,
        Commands::Init | Commands::Serve => {}
    }

    Ok(())
}
