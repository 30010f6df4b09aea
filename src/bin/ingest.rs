use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pdfrag::config::{ChunkArgs, ProviderArgs, StoreArgs};
use pdfrag::logging::init_tracing;
use pdfrag::{ingest, load_pdf, split_pages, PgVectorStore, VectorStore};

#[derive(Parser, Debug)]
#[command(
    name = "pdfrag-ingest",
    about = "Load a PDF, embed its chunks and store them in pgvector"
)]
struct IngestCli {
    /// PDF document to ingest
    #[arg(long, env = "PDF_PATH", default_value = "document.pdf")]
    pdf: PathBuf,

    #[command(flatten)]
    provider: ProviderArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    chunking: ChunkArgs,

    /// Only report how many pages and chunks the document yields
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Log pipeline progress to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = IngestCli::parse();
    init_tracing(cli.verbose)?;
    let chunk_config = cli.chunking.to_config().context("invalid chunk settings")?;

    if cli.dry_run {
        let pages = load_pdf(&cli.pdf)?;
        let chunks = split_pages(&pages, &chunk_config)?;
        println!(
            "{} page{} would produce {} chunk{}; dry-run enabled, nothing stored.",
            pages.len(),
            if pages.len() == 1 { "" } else { "s" },
            chunks.len(),
            if chunks.len() == 1 { "" } else { "s" }
        );
        return Ok(());
    }

    let provider = cli
        .provider
        .resolve()
        .context("provider configuration incomplete")?;
    let store_config = cli
        .store
        .resolve()
        .context("vector store configuration incomplete")?;
    let embedder = provider
        .build_embedder()
        .context("failed to initialise embedder")?;
    println!(
        "Using {} embeddings ({}).",
        provider.kind,
        embedder.model()
    );

    let mut store = PgVectorStore::connect(&store_config.database_url, store_config.table.clone())
        .context("failed to connect to the vector store")?;
    println!("Loading {}...", cli.pdf.display());
    let report = ingest(&cli.pdf, &chunk_config, embedder.as_ref(), &mut store)
        .with_context(|| format!("failed to ingest {}", cli.pdf.display()))?;
    let total = store.count().context("failed to count stored chunks")?;
    println!(
        "Stored {} chunk{} from {} page{} into {} ({} total).",
        report.chunks,
        if report.chunks == 1 { "" } else { "s" },
        report.pages,
        if report.pages == 1 { "" } else { "s" },
        store_config.table.qualified(),
        total
    );
    if report.removed > 0 {
        println!(
            "Removed {} stale chunk{} left by an earlier version of this document.",
            report.removed,
            if report.removed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
