use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use pdfrag::config::{AnswerArgs, ProviderArgs, StoreArgs};
use pdfrag::logging::init_tracing;
use pdfrag::{answer, chat, PgVectorStore};

#[derive(Parser, Debug)]
#[command(
    name = "pdfrag-chat",
    about = "Ask questions answered only from the ingested PDF"
)]
struct ChatCli {
    #[command(flatten)]
    provider: ProviderArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    answering: AnswerArgs,

    /// Log pipeline progress to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = ChatCli::parse();
    init_tracing(cli.verbose)?;

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
    let generator = provider
        .build_generator(cli.answering.settings())
        .context("failed to initialise answer model")?;
    let store = PgVectorStore::connect(&store_config.database_url, store_config.table.clone())
        .context("failed to connect to the vector store")?;

    println!("PDF chat ({} / {})", provider.kind, generator.model());
    println!("{}", "=".repeat(50));
    println!("Type 'exit' or 'quit' to leave.\n");

    let top_k = cli.answering.top_k;
    let stdin = io::stdin();
    chat::run(stdin.lock(), io::stdout(), |question| {
        answer(question, embedder.as_ref(), &store, top_k, generator.as_ref())
    })
    .context("chat session failed")?;
    Ok(())
}
