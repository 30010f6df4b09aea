//! Ingestion and question-answering orchestration.
//!
//! Each function runs its stages in order and stops at the first failure,
//! returning a [`PipelineError`] that names the stage.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use crate::chunker::{split_pages, ChunkConfig};
use crate::embedder::Embedder;
use crate::error::{PipelineError, StoreError};
use crate::generator::AnswerGenerator;
use crate::loader::{load_pdf, PageRecord};
use crate::prompt;
use crate::vector_store::{SearchResult, StoredEntry, VectorStore};

/// Number of entries written per store transaction.
pub const UPSERT_BATCH: usize = 128;
/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 10;

/// Summary of a finished ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
    /// Entries left over from an earlier ingestion of the same document.
    pub removed: usize,
}

/// Loads, chunks, embeds and stores the PDF at `path`.
pub fn ingest(
    path: &Path,
    config: &ChunkConfig,
    embedder: &dyn Embedder,
    store: &mut dyn VectorStore,
) -> Result<IngestReport, PipelineError> {
    let pages = load_pdf(path)?;
    ingest_pages(&pages, config, embedder, store)
}

/// Same as [`ingest`], starting from already extracted pages.
pub fn ingest_pages(
    pages: &[PageRecord],
    config: &ChunkConfig,
    embedder: &dyn Embedder,
    store: &mut dyn VectorStore,
) -> Result<IngestReport, PipelineError> {
    let chunks = split_pages(pages, config)?;
    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    let vectors = embedder.embed_many(&texts).map_err(PipelineError::Embed)?;
    info!(
        "embedded {} chunks with {}/{}",
        vectors.len(),
        embedder.provider(),
        embedder.model()
    );

    let model_id = embedder.model_id();
    let entries: Vec<StoredEntry> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| {
            StoredEntry::from_chunk(chunk, vector).with_embedding_model(&model_id)
        })
        .collect();
    for (batch_no, batch) in entries.chunks(UPSERT_BATCH).enumerate() {
        store.upsert(batch).map_err(PipelineError::Store)?;
        debug!(batch = batch_no, size = batch.len(), "stored batch");
    }
    info!("stored {} chunks", entries.len());

    let keep: Vec<_> = entries.iter().map(|entry| entry.id).collect();
    let sources: BTreeSet<&str> = pages.iter().map(|page| page.source_path.as_str()).collect();
    let mut removed = 0;
    for source in sources {
        removed += store.remove_stale(source, &keep).map_err(PipelineError::Store)?;
    }
    if removed > 0 {
        info!("removed {removed} stale chunks");
    }

    Ok(IngestReport {
        pages: pages.len(),
        chunks: entries.len(),
        removed,
    })
}

/// Embeds `question` and returns the `k` closest stored chunks.
pub fn retrieve(
    question: &str,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    k: usize,
) -> Result<Vec<SearchResult>, PipelineError> {
    let model_id = embedder.model_id();
    if let Some(stored) = store.embedding_model().map_err(PipelineError::Search)? {
        if stored != model_id {
            return Err(PipelineError::Search(StoreError::ModelMismatch {
                expected: stored,
                actual: model_id,
            }));
        }
    }
    let query = embedder.embed_one(question).map_err(PipelineError::Embed)?;
    let results = store
        .similarity_search(&query, k)
        .map_err(PipelineError::Search)?;
    debug!(requested = k, returned = results.len(), "retrieved context");
    Ok(results)
}

/// Answers `question` from the stored document.
///
/// The generator's text is returned as is. Whether it falls back to
/// [`prompt::FALLBACK_ANSWER`] is decided by the generator following the
/// prompt's rules, not by this function.
pub fn answer(
    question: &str,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    k: usize,
    generator: &dyn AnswerGenerator,
) -> Result<String, PipelineError> {
    let results = retrieve(question, embedder, store, k)?;
    let context: Vec<&str> = results
        .iter()
        .map(|result| result.entry.document.as_str())
        .collect();
    let prompt = prompt::assemble(&context, question);
    let answer = generator.generate(&prompt).map_err(PipelineError::Generate)?;
    info!(
        "answered with {}/{} from {} chunks",
        generator.provider(),
        generator.model(),
        context.len()
    );
    Ok(answer)
}
